/*!
 * Process Module
 * Process registry, lifecycle engine, and delayed reclamation
 */

pub mod builder;
pub mod engine;
pub mod invariants;
pub mod programs;
pub mod reclamation;
pub mod registry;
pub mod topology;
pub mod types;

// Re-export for convenience
pub use builder::LifecycleEngineBuilder;
pub use engine::LifecycleEngine;
pub use invariants::{check_all_invariants, InvariantViolation};
pub use programs::{CyclingChooser, ProgramCatalog, ProgramChooser, ProgramImage, RandomChooser};
pub use reclamation::{PendingReap, Reaper, ReclamationScheduler, ReclamationStats};
pub use registry::ProcessRegistry;
pub use topology::{SeedProcess, Topology};
pub use types::{
    ChildSummary, Process, ProcessDetails, ProcessImage, ProcessStatus, SystemStatus,
    TerminationReport,
};
