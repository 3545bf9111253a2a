/*!
 * Process Tree Kernel Library
 * Simulated process registry, lifecycle engine, and guided demo
 */

pub mod core;
pub mod demo;
pub mod monitoring;
pub mod process;

// Core re-exports
pub use crate::core::{
    ConfigError, DemoTiming, KernelConfig, Operation, ProcessError, ProcessResult, RegistryError,
    RegistryResult,
};
pub use crate::core::types::{Environment, Fd, Pid, NO_PARENT, ROOT_PID};

// Process re-exports
pub use process::{
    CyclingChooser, InvariantViolation, LifecycleEngine, LifecycleEngineBuilder, PendingReap,
    Process, ProcessDetails, ProcessImage, ProcessStatus, ProgramCatalog, ProgramChooser,
    ProgramImage, RandomChooser, ReclamationStats, SystemStatus, TerminationReport, Topology,
};

// Monitoring re-exports
pub use monitoring::{init_tracing, LifecycleEvent};

// Demo re-exports
pub use demo::{
    run_demo, DemoError, DemoObserver, DemoOutcome, DemoRunner, DemoStep, NullObserver,
    TracingObserver, ViewMode,
};
