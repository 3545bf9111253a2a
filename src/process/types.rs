/*!
 * Process Types
 * The process entity and the values returned by lifecycle operations
 */

use crate::core::types::{Environment, Fd, Pid, NO_PARENT, ROOT_PID};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process status
///
/// `Reaped` is not a status: reaping deletes the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Zombie,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Running => f.write_str("running"),
            ProcessStatus::Zombie => f.write_str("zombie"),
        }
    }
}

/// A simulated process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Process {
    pub pid: Pid,
    pub ppid: Pid,
    pub name: String,
    pub status: ProcessStatus,
    pub file_descriptors: Vec<Fd>,
    pub environment: Environment,
    pub working_directory: String,
    /// Set once the process has been adopted by the root
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub orphaned: bool,
}

impl Process {
    /// Create the root process
    #[must_use]
    pub fn root(image: ProcessImage) -> Self {
        Self::from_image(ROOT_PID, NO_PARENT, image)
    }

    /// Create a running process from an image
    #[must_use]
    pub fn from_image(pid: Pid, ppid: Pid, image: ProcessImage) -> Self {
        Self {
            pid,
            ppid,
            name: image.name,
            status: ProcessStatus::Running,
            file_descriptors: normalize_fds(image.file_descriptors),
            environment: image.environment,
            working_directory: image.working_directory,
            orphaned: false,
        }
    }

    /// Build the child this process produces when it forks
    ///
    /// Descriptors, environment and working directory are copied, never shared.
    #[must_use]
    pub fn forked(&self, child_pid: Pid, child_name: String) -> Self {
        Self {
            pid: child_pid,
            ppid: self.pid,
            name: child_name,
            status: ProcessStatus::Running,
            file_descriptors: self.file_descriptors.clone(),
            environment: self.environment.clone(),
            working_directory: self.working_directory.clone(),
            orphaned: false,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.pid == ROOT_PID
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.status, ProcessStatus::Running)
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_zombie(&self) -> bool {
        matches!(self.status, ProcessStatus::Zombie)
    }
}

/// The resources a process starts with (or seeds the registry with)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessImage {
    pub name: String,
    pub file_descriptors: Vec<Fd>,
    pub environment: Environment,
    pub working_directory: String,
}

impl ProcessImage {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_descriptors: Vec::new(),
            environment: Environment::new(),
            working_directory: "/".to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_fds(mut self, fds: impl IntoIterator<Item = Fd>) -> Self {
        self.file_descriptors = fds.into_iter().collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_env(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }
}

/// Outcome of a termination-causing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TerminationReport {
    pub terminated_pid: Pid,
    /// Children adopted by the root, ascending
    pub orphaned_pids: Vec<Pid>,
}

impl TerminationReport {
    #[inline]
    #[must_use]
    pub fn has_orphans(&self) -> bool {
        !self.orphaned_pids.is_empty()
    }
}

/// Short description of a child process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChildSummary {
    pub pid: Pid,
    pub name: String,
    pub status: ProcessStatus,
}

impl From<&Process> for ChildSummary {
    fn from(process: &Process) -> Self {
        Self {
            pid: process.pid,
            name: process.name.clone(),
            status: process.status,
        }
    }
}

/// Everything a details panel shows about one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessDetails {
    pub process: Process,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    pub children: Vec<ChildSummary>,
}

/// Orphan and zombie counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SystemStatus {
    pub zombies: usize,
    pub orphans: usize,
}

/// Sort and deduplicate descriptors into an ordered set
pub(crate) fn normalize_fds(mut fds: Vec<Fd>) -> Vec<Fd> {
    fds.sort_unstable();
    fds.dedup();
    fds
}
