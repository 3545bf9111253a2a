/*!
 * Demo Script
 * The fixed walkthrough steps, view modes, and demo errors
 */

use crate::core::config::DemoTiming;
use crate::core::errors::ProcessError;
use crate::core::types::Pid;
use crate::process::types::TerminationReport;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How the presentation layer renders the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Basic,
    Pids,
    Fds,
    Inheritance,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewMode::Basic => "basic",
            ViewMode::Pids => "pids",
            ViewMode::Fds => "fds",
            ViewMode::Inheritance => "inheritance",
        };
        f.write_str(name)
    }
}

/// One step of the walkthrough, in script order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoStep {
    SelectShell,
    Fork,
    KillParent,
    ShowFds,
    ShowInheritance,
}

impl DemoStep {
    /// Pause between this step and the next; the last step has none
    pub fn wait_after(self, timing: &DemoTiming) -> Duration {
        match self {
            DemoStep::SelectShell => timing.after_select,
            DemoStep::Fork => timing.after_spawn,
            DemoStep::KillParent => timing.after_kill,
            DemoStep::ShowFds => timing.after_view_switch,
            DemoStep::ShowInheritance => Duration::ZERO,
        }
    }

    /// Message shown to the viewer when the step starts
    pub fn announcement(self) -> &'static str {
        match self {
            DemoStep::SelectShell => "Demo: Selecting the shell process...",
            DemoStep::Fork => "Demo: Forking a new process...",
            DemoStep::KillParent => "Demo: Killing parent to create orphan...",
            DemoStep::ShowFds => "Demo: Switching to File Descriptor view...",
            DemoStep::ShowInheritance => "Demo: Switching to Inheritance view...",
        }
    }
}

impl fmt::Display for DemoStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DemoStep::SelectShell => "select shell",
            DemoStep::Fork => "fork",
            DemoStep::KillParent => "kill parent",
            DemoStep::ShowFds => "show fds",
            DemoStep::ShowInheritance => "show inheritance",
        };
        f.write_str(name)
    }
}

/// What a completed walkthrough did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoOutcome {
    pub selected_pid: Pid,
    pub spawned_pid: Pid,
    pub termination: TerminationReport,
    pub view_mode: ViewMode,
}

/// Demo errors
///
/// Steps already applied are not rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum DemoError {
    #[error("Demo aborted: no process named {0:?}")]
    #[diagnostic(
        code(demo::process_not_found),
        help("Seed the engine with a topology that contains this process.")
    )]
    ProcessNotFound(String),

    #[error("Demo aborted at step '{step}'")]
    #[diagnostic(code(demo::step_failed))]
    Step {
        step: DemoStep,
        #[source]
        #[diagnostic_source]
        source: ProcessError,
    },
}

impl DemoError {
    /// Step the demo stopped at
    pub fn step(&self) -> DemoStep {
        match self {
            DemoError::ProcessNotFound(_) => DemoStep::SelectShell,
            DemoError::Step { step, .. } => *step,
        }
    }
}
