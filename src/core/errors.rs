/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::Pid;
use crate::process::types::ProcessStatus;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Operation that was attempted against a protected process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Remove,
    ImageReplace,
    Terminate,
    KillParent,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Remove => "remove",
            Operation::ImageReplace => "image replace",
            Operation::Terminate => "terminate",
            Operation::KillParent => "kill parent of",
        };
        f.write_str(name)
    }
}

/// Registry errors
///
/// Raised by the registry itself. `DuplicatePid` means the pid allocator is
/// broken and is never expected in practice.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RegistryError {
    #[error("Process {0} not found")]
    #[diagnostic(
        code(registry::not_found),
        help("The process may have been reaped or never existed. Re-check the PID.")
    )]
    NotFound(Pid),

    #[error("Cannot {operation} process {pid}: it is the root process")]
    #[diagnostic(
        code(registry::forbidden),
        help("PID 1 is permanent and is never removed.")
    )]
    Forbidden { pid: Pid, operation: Operation },

    #[error("Duplicate PID {0} in registry")]
    #[diagnostic(
        code(registry::duplicate_pid),
        help("The PID allocator issued an identifier twice. Please report this issue.")
    )]
    DuplicatePid(Pid),
}

/// Lifecycle operation errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("No such process: {0}")]
    #[diagnostic(
        code(process::no_such_process),
        help("The process may have terminated and been reaped. Refresh the process list.")
    )]
    NoSuchProcess(Pid),

    #[error("Cannot {operation} process {pid}: it is the root process")]
    #[diagnostic(
        code(process::forbidden),
        help("The init process (PID 1) cannot be replaced or terminated.")
    )]
    Forbidden { pid: Pid, operation: Operation },

    #[error("Process {0} has no killable parent")]
    #[diagnostic(
        code(process::no_killable_parent),
        help("Its parent is the init process, which cannot be terminated.")
    )]
    NoKillableParent(Pid),

    #[error("Process {pid} is {status}, expected running")]
    #[diagnostic(
        code(process::not_running),
        help("Zombie processes only wait to be reaped; they cannot fork, exec, or terminate again.")
    )]
    NotRunning { pid: Pid, status: ProcessStatus },

    #[error("Cannot terminate process {0}: reclamation is shut down")]
    #[diagnostic(
        code(process::reclamation_closed),
        help("The engine has been shut down; its zombies could never be reaped.")
    )]
    ReclamationClosed(Pid),

    #[error("Invalid topology: {0}")]
    #[diagnostic(
        code(process::invalid_topology),
        help("Every seeded process must name a parent seeded before it.")
    )]
    InvalidTopology(String),

    #[error("No Tokio runtime available to run the reclamation task")]
    #[diagnostic(
        code(process::runtime_unavailable),
        help("Build the engine from within a Tokio runtime, or pass a runtime handle.")
    )]
    RuntimeUnavailable,

    #[error("Internal registry fault: {0}")]
    #[diagnostic(
        code(process::internal),
        help("An unexpected internal error occurred. Please report this issue.")
    )]
    Internal(RegistryError),
}

impl From<RegistryError> for ProcessError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(pid) => ProcessError::NoSuchProcess(pid),
            RegistryError::Forbidden { pid, operation } => {
                ProcessError::Forbidden { pid, operation }
            }
            fault @ RegistryError::DuplicatePid(_) => ProcessError::Internal(fault),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    #[diagnostic(
        code(config::invalid_value),
        help("Unset the variable to use the default, or provide a valid value.")
    )]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Registry operation result
pub type RegistryResult<T> = Result<T, RegistryError>;
