/*!
 * Core Types
 * Common types used across the process tree kernel
 */

use std::collections::BTreeMap;

/// Process ID type
pub type Pid = u32;

/// File descriptor type
///
/// Opaque identifier only; nothing in the kernel performs I/O through it.
pub type Fd = u32;

/// Environment of a process (ordered for stable display)
pub type Environment = BTreeMap<String, String>;

/// Reserved parent id meaning "no parent"
pub const NO_PARENT: Pid = 0;

/// Pid of the root ("init") process
pub const ROOT_PID: Pid = 1;

/// First pid handed out after the root
pub const FIRST_CHILD_PID: Pid = ROOT_PID + 1;

/// Build an environment from borrowed key/value pairs
pub fn environment<'a, I>(pairs: I) -> Environment
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
