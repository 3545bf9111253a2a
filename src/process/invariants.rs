/*!
 * Registry Invariants
 *
 * Runtime-checkable properties that hold between any two lifecycle
 * operations. Used for debug assertions in the engine and by the
 * property tests.
 *
 * # Invariants
 *
 * 1. **Permanent root**: exactly one process has pid 1, it is running and
 *    it is the only entry with no parent
 * 2. **No dangling parents**: every non-zero `ppid` names an existing entry
 * 3. **PID monotonicity**: the next pid is greater than every existing pid
 * 4. **Childless zombies**: a zombie has no children (they were adopted
 *    when it terminated), so reaping it cannot strand anyone
 */

use crate::core::types::{NO_PARENT, ROOT_PID};
use crate::process::registry::ProcessRegistry;
use serde::Serialize;
use std::fmt;

/// An invariant violation with details
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.description)
    }
}

/// Check all registry invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants(registry: &ProcessRegistry) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_permanent_root(registry));
    violations.extend(check_parent_references(registry));
    violations.extend(check_pid_monotonicity(registry));
    violations.extend(check_childless_zombies(registry));

    violations
}

/// Invariant 1: the root exists, is running, and is the only parentless entry
fn check_permanent_root(registry: &ProcessRegistry) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    match registry.get(ROOT_PID) {
        Ok(root) => {
            if !root.is_running() {
                violations.push(InvariantViolation {
                    invariant: "permanent_root",
                    description: format!("Root process is {}", root.status),
                });
            }
            if root.ppid != NO_PARENT {
                violations.push(InvariantViolation {
                    invariant: "permanent_root",
                    description: format!("Root process has parent {}", root.ppid),
                });
            }
        }
        Err(_) => violations.push(InvariantViolation {
            invariant: "permanent_root",
            description: "Root process is missing".to_string(),
        }),
    }

    for process in registry.iter() {
        if process.pid != ROOT_PID && process.ppid == NO_PARENT {
            violations.push(InvariantViolation {
                invariant: "permanent_root",
                description: format!("Process {} has no parent but is not the root", process.pid),
            });
        }
    }

    violations
}

/// Invariant 2: every parent reference resolves
fn check_parent_references(registry: &ProcessRegistry) -> Vec<InvariantViolation> {
    registry
        .iter()
        .filter(|p| p.ppid != NO_PARENT && !registry.contains(p.ppid))
        .map(|p| InvariantViolation {
            invariant: "parent_references",
            description: format!(
                "Process {} references non-existent parent {}",
                p.pid, p.ppid
            ),
        })
        .collect()
}

/// Invariant 3: the pid counter is ahead of every issued pid
fn check_pid_monotonicity(registry: &ProcessRegistry) -> Vec<InvariantViolation> {
    let next = registry.peek_next_pid();

    registry
        .iter()
        .filter(|p| p.pid >= next)
        .map(|p| InvariantViolation {
            invariant: "pid_monotonicity",
            description: format!("Process {} is not below next pid {}", p.pid, next),
        })
        .collect()
}

/// Invariant 4: zombies have no children
fn check_childless_zombies(registry: &ProcessRegistry) -> Vec<InvariantViolation> {
    registry
        .iter()
        .filter(|p| p.is_zombie())
        .filter_map(|zombie| {
            let children = registry.child_pids(zombie.pid);
            (!children.is_empty()).then(|| InvariantViolation {
                invariant: "childless_zombies",
                description: format!("Zombie {} still has children {:?}", zombie.pid, children),
            })
        })
        .collect()
}
