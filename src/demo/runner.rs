/*!
 * Demo Runner
 *
 * Drives the engine through the scripted walkthrough. Waits are awaited one
 * after another, so a step never starts before the previous step's effects
 * are applied and its wait has elapsed. Reclamations scheduled by earlier
 * steps keep running underneath on their own timers.
 */

use crate::core::config::DemoTiming;
use crate::core::limits::DEMO_SHELL_NAME;
use crate::demo::observer::DemoObserver;
use crate::demo::script::{DemoError, DemoOutcome, DemoStep, ViewMode};
use crate::monitoring::tracer::generate_trace_id;
use crate::process::engine::LifecycleEngine;
use tracing::{debug, info, info_span, warn, Instrument};

/// Scripted walkthrough over one engine
#[derive(Debug, Clone)]
pub struct DemoRunner {
    engine: LifecycleEngine,
    timing: DemoTiming,
    shell_name: String,
}

impl DemoRunner {
    pub fn new(engine: LifecycleEngine, timing: DemoTiming) -> Self {
        Self {
            engine,
            timing,
            shell_name: DEMO_SHELL_NAME.to_string(),
        }
    }

    /// Select a different process in the first step
    pub fn with_shell_name(mut self, name: impl Into<String>) -> Self {
        self.shell_name = name.into();
        self
    }

    /// Run the walkthrough to completion or to the first failing step
    pub async fn run(&self, observer: &dyn DemoObserver) -> Result<DemoOutcome, DemoError> {
        let span = info_span!("demo", trace_id = %generate_trace_id());
        let result = self.run_script(observer).instrument(span.clone()).await;

        let _entered = span.enter();
        match &result {
            Ok(outcome) => info!(
                selected = outcome.selected_pid,
                spawned = outcome.spawned_pid,
                orphans = outcome.termination.orphaned_pids.len(),
                "Demo complete"
            ),
            Err(e) => warn!(step = %e.step(), error = %e, "Demo aborted"),
        }
        result
    }

    async fn run_script(&self, observer: &dyn DemoObserver) -> Result<DemoOutcome, DemoError> {
        begin(observer, DemoStep::SelectShell);
        let selected = self
            .engine
            .find_by_name(&self.shell_name)
            .ok_or_else(|| DemoError::ProcessNotFound(self.shell_name.clone()))?;
        self.settle(DemoStep::SelectShell).await;

        begin(observer, DemoStep::Fork);
        let child = self
            .engine
            .spawn(selected.pid)
            .map_err(|source| DemoError::Step {
                step: DemoStep::Fork,
                source,
            })?;
        self.settle(DemoStep::Fork).await;

        begin(observer, DemoStep::KillParent);
        let termination =
            self.engine
                .kill_parent_of(child.pid)
                .map_err(|source| DemoError::Step {
                    step: DemoStep::KillParent,
                    source,
                })?;
        self.settle(DemoStep::KillParent).await;

        begin(observer, DemoStep::ShowFds);
        observer.set_view_mode(ViewMode::Fds);
        self.settle(DemoStep::ShowFds).await;

        begin(observer, DemoStep::ShowInheritance);
        observer.set_view_mode(ViewMode::Inheritance);
        self.settle(DemoStep::ShowInheritance).await;

        Ok(DemoOutcome {
            selected_pid: selected.pid,
            spawned_pid: child.pid,
            termination,
            view_mode: ViewMode::Inheritance,
        })
    }

    /// Wait out the pause that follows `step`
    async fn settle(&self, step: DemoStep) {
        let wait = step.wait_after(&self.timing);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

fn begin(observer: &dyn DemoObserver, step: DemoStep) {
    debug!(step = %step, "Demo step starting");
    observer.announce(step, step.announcement());
}

/// Run the walkthrough on `engine` with the given pacing
pub async fn run_demo(
    engine: &LifecycleEngine,
    timing: DemoTiming,
    observer: &dyn DemoObserver,
) -> Result<DemoOutcome, DemoError> {
    DemoRunner::new(engine.clone(), timing).run(observer).await
}
