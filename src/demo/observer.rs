/*!
 * Demo Observer
 * Receives demo announcements and view-mode switches
 */

use crate::demo::script::{DemoStep, ViewMode};
use tracing::info;

/// Presentation hooks for the demo runner
pub trait DemoObserver: Send + Sync {
    /// A step is about to run
    fn announce(&self, step: DemoStep, message: &str);

    /// The viewer should switch how the tree is drawn
    fn set_view_mode(&self, mode: ViewMode);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl DemoObserver for NullObserver {
    fn announce(&self, _step: DemoStep, _message: &str) {}

    fn set_view_mode(&self, _mode: ViewMode) {}
}

/// Logs announcements and view switches through tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DemoObserver for TracingObserver {
    fn announce(&self, step: DemoStep, message: &str) {
        info!(step = %step, "{}", message);
    }

    fn set_view_mode(&self, mode: ViewMode) {
        info!(view_mode = %mode, "View mode switched");
    }
}
