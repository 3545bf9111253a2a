/*!
 * Demo Runner Tests
 * Tests for step ordering, pacing and abort behavior
 */

use proctree_kernel::{
    DemoError, DemoObserver, DemoRunner, DemoStep, DemoTiming, LifecycleEngine, ProcessError,
    ProcessStatus, Topology, ViewMode,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Step(DemoStep, u64),
    View(ViewMode, u64),
}

/// Records what happened and when, in milliseconds since creation
struct RecordingObserver {
    start: Instant,
    seen: Mutex<Vec<Seen>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }
}

impl DemoObserver for RecordingObserver {
    fn announce(&self, step: DemoStep, _message: &str) {
        let at = self.elapsed_ms();
        self.seen.lock().push(Seen::Step(step, at));
    }

    fn set_view_mode(&self, mode: ViewMode) {
        let at = self.elapsed_ms();
        self.seen.lock().push(Seen::View(mode, at));
    }
}

fn classroom() -> LifecycleEngine {
    LifecycleEngine::builder()
        .with_topology(Topology::classroom())
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_steps_are_sequential_and_paced() {
    let engine = classroom();
    let observer = RecordingObserver::new();

    DemoRunner::new(engine, DemoTiming::default())
        .run(&observer)
        .await
        .unwrap();

    assert_eq!(
        observer.seen(),
        vec![
            Seen::Step(DemoStep::SelectShell, 0),
            Seen::Step(DemoStep::Fork, 1000),
            Seen::Step(DemoStep::KillParent, 3000),
            Seen::Step(DemoStep::ShowFds, 6000),
            Seen::View(ViewMode::Fds, 6000),
            Seen::Step(DemoStep::ShowInheritance, 8000),
            Seen::View(ViewMode::Inheritance, 8000),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_waits_do_not_overlap_with_reclamation() {
    // Reclamation delay longer than the remaining script
    let engine = LifecycleEngine::builder()
        .with_topology(Topology::classroom())
        .with_reap_delay(Duration::from_secs(60))
        .build()
        .unwrap();
    let observer = RecordingObserver::new();

    let outcome = DemoRunner::new(engine.clone(), DemoTiming::default())
        .run(&observer)
        .await
        .unwrap();

    assert_eq!(observer.elapsed_ms(), 8000);
    assert_eq!(engine.get(2).unwrap().status, ProcessStatus::Zombie);
    assert_eq!(engine.pending_reclamations().len(), 1);
    assert_eq!(outcome.termination.orphaned_pids, vec![3, 4, 5]);
    for pid in outcome.termination.orphaned_pids {
        let orphan = engine.get(pid).unwrap();
        assert_eq!(orphan.ppid, 1);
        assert!(orphan.orphaned);
    }
}

#[tokio::test(start_paused = true)]
async fn test_scaled_timing() {
    let engine = classroom();
    let observer = RecordingObserver::new();

    DemoRunner::new(engine, DemoTiming::default().scaled(0.5))
        .run(&observer)
        .await
        .unwrap();

    assert_eq!(observer.elapsed_ms(), 4000);
}

#[tokio::test(start_paused = true)]
async fn test_missing_shell_aborts_before_any_change() {
    let engine = LifecycleEngine::builder().build().unwrap();
    let observer = RecordingObserver::new();

    let err = DemoRunner::new(engine.clone(), DemoTiming::default())
        .run(&observer)
        .await
        .unwrap_err();

    assert_eq!(err, DemoError::ProcessNotFound("bash".into()));
    assert_eq!(observer.seen(), vec![Seen::Step(DemoStep::SelectShell, 0)]);
    assert_eq!(engine.snapshot().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_step_failure_surfaces_error() {
    let engine = classroom();
    let runner = DemoRunner::new(engine.clone(), DemoTiming::default());

    // The shell dies during the first wait, so the fork step fails
    let killer = {
        let engine = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            engine.terminate(2).unwrap();
        })
    };

    let observer = RecordingObserver::new();
    let err = runner.run(&observer).await.unwrap_err();
    killer.await.unwrap();

    assert_eq!(err.step(), DemoStep::Fork);
    assert!(matches!(
        err,
        DemoError::Step {
            source: ProcessError::NotRunning { pid: 2, .. },
            ..
        }
    ));
    assert_eq!(observer.elapsed_ms(), 1000);
    assert!(engine.children_of(2).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_shell_name() {
    let engine = classroom();
    let outcome = DemoRunner::new(engine.clone(), DemoTiming::default())
        .with_shell_name("vim")
        .run(&RecordingObserver::new())
        .await
        .unwrap();

    assert_eq!(outcome.selected_pid, 3);
    assert_eq!(outcome.termination.terminated_pid, 3);
    assert!(engine.get(5).unwrap().orphaned);
}
