/*!
 * Demo Module
 * Guided walkthrough of fork, orphaning and reaping
 */

pub mod observer;
pub mod runner;
pub mod script;

pub use observer::{DemoObserver, NullObserver, TracingObserver};
pub use runner::{run_demo, DemoRunner};
pub use script::{DemoError, DemoOutcome, DemoStep, ViewMode};
