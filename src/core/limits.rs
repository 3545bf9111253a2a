/*!
 * System Limits and Constants
 *
 * Centralized location for lifecycle timings and defaults.
 * Organized by domain for maintainability and discoverability.
 */

use std::time::Duration;

// =============================================================================
// RECLAMATION
// =============================================================================

/// Delay between a process becoming a zombie and its entry being reaped
pub const DEFAULT_REAP_DELAY: Duration = Duration::from_millis(2000);

/// Pending reclamations above this count are still accepted but logged at WARN
pub const PENDING_REAP_WARN_THRESHOLD: usize = 1024;

// =============================================================================
// DEMO PACING
// =============================================================================

/// Wait after selecting the shell process
pub const DEMO_AFTER_SELECT: Duration = Duration::from_millis(1000);

/// Wait after spawning from the shell
pub const DEMO_AFTER_SPAWN: Duration = Duration::from_millis(2000);

/// Wait after killing the shell
/// Longer than [`DEFAULT_REAP_DELAY`] so the zombie is gone before the next step;
/// `KernelConfig::validate` rejects configurations that break this
pub const DEMO_AFTER_KILL: Duration = Duration::from_millis(3000);

/// Wait after each view-mode switch
pub const DEMO_AFTER_VIEW_SWITCH: Duration = Duration::from_millis(2000);

/// Name of the process the demo starts from
pub const DEMO_SHELL_NAME: &str = "bash";

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// Lifecycle event broadcast capacity
/// Slow subscribers lag (and skip) past this many events
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Operations slower than this are logged at WARN
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(100);

// =============================================================================
// NAMING
// =============================================================================

/// Prefix given to spawned children (`child_<parent>`)
pub const CHILD_NAME_PREFIX: &str = "child_";

/// Name of the root process
pub const ROOT_NAME: &str = "init";
