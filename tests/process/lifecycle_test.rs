/*!
 * Lifecycle Engine Tests
 * Tests for fork, exec, termination, orphan adoption and reaping
 */

use proctree_kernel::{
    CyclingChooser, LifecycleEngine, Operation, ProcessError, ProcessImage, ProcessStatus,
    TerminationReport, Topology, ROOT_PID,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn engine() -> LifecycleEngine {
    LifecycleEngine::builder()
        .with_chooser(CyclingChooser::default())
        .build()
        .unwrap()
}

fn classroom() -> LifecycleEngine {
    LifecycleEngine::builder()
        .with_topology(Topology::classroom())
        .with_chooser(CyclingChooser::default())
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_scenario() {
    let engine = engine();

    let shell = engine.spawn(ROOT_PID).unwrap().pid;
    assert_eq!(shell, 2);
    engine.image_replace(shell, "bash", vec![0, 1, 2, 3]).unwrap();
    assert_eq!(engine.spawn(shell).unwrap().pid, 3);
    assert_eq!(engine.spawn(shell).unwrap().pid, 4);

    let report = engine.terminate(shell).unwrap();
    assert_eq!(
        report,
        TerminationReport {
            terminated_pid: 2,
            orphaned_pids: vec![3, 4],
        }
    );
    assert_eq!(engine.get(2).unwrap().status, ProcessStatus::Zombie);
    assert_eq!(engine.get(3).unwrap().ppid, ROOT_PID);
    assert_eq!(engine.get(4).unwrap().ppid, ROOT_PID);

    tokio::time::sleep(engine.reap_delay() + Duration::from_millis(1)).await;

    let pids: Vec<u32> = engine.snapshot().iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![1, 3, 4]);
    assert!(engine.check_invariants().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_zombie_visible_until_delay_elapses() {
    let engine = engine();
    let pid = engine.spawn(ROOT_PID).unwrap().pid;
    engine.terminate(pid).unwrap();

    tokio::time::sleep(engine.reap_delay() - Duration::from_millis(1)).await;
    assert!(engine.exists(pid));
    assert_eq!(engine.pending_reclamations().len(), 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert!(!engine.exists(pid));
    assert!(engine.pending_reclamations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_spawn_copies_parent_resources() {
    let engine = classroom();
    let child = engine.spawn(3).unwrap();
    let vim = engine.get(3).unwrap();

    assert_eq!(child.ppid, 3);
    assert_eq!(child.name, "child_vim");
    assert_eq!(child.file_descriptors, vim.file_descriptors);
    assert_eq!(child.environment, vim.environment);
    assert_eq!(child.environment.get("EDITOR").map(String::as_str), Some("vim"));
    assert_eq!(child.working_directory, "/home/student");
    assert!(!child.orphaned);
}

#[tokio::test(start_paused = true)]
async fn test_pid_monotonic_across_reaps() {
    let engine = engine();
    let mut last = ROOT_PID;

    for _ in 0..5 {
        let pid = engine.spawn(ROOT_PID).unwrap().pid;
        assert!(pid > last);
        last = pid;
        engine.terminate(pid).unwrap();
        tokio::time::sleep(engine.reap_delay() * 2).await;
        assert!(!engine.exists(pid));
    }

    assert_eq!(engine.spawn(ROOT_PID).unwrap().pid, last + 1);
}

#[tokio::test(start_paused = true)]
async fn test_orphan_reparenting() {
    let engine = engine();
    let a = engine.spawn(ROOT_PID).unwrap().pid;
    let b = engine.spawn(a).unwrap().pid;

    let report = engine.terminate(a).unwrap();

    assert_eq!(report.orphaned_pids, vec![b]);
    let adopted = engine.get(b).unwrap();
    assert_eq!(adopted.ppid, ROOT_PID);
    assert!(adopted.orphaned);
    assert_eq!(adopted.status, ProcessStatus::Running);
    assert!(engine.children_of(a).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_terminate_leaf_has_no_orphans() {
    let engine = classroom();
    let report = engine.terminate(4).unwrap();
    assert!(!report.has_orphans());
    assert_eq!(engine.status().orphans, 0);
}

#[tokio::test(start_paused = true)]
async fn test_image_replace_preserves_identity() {
    let engine = classroom();
    let before = engine.get(3).unwrap();

    let after = engine.image_replace(3, "newname", vec![0, 1, 2, 9]).unwrap();

    assert_eq!(after.pid, 3);
    assert_eq!(after.ppid, before.ppid);
    assert_eq!(after.name, "newname");
    assert_eq!(after.file_descriptors, vec![0, 1, 2, 9]);
    assert_eq!(after.environment, before.environment);
    assert_eq!(after.working_directory, before.working_directory);
    assert_eq!(engine.get(3).unwrap(), after);
}

#[tokio::test(start_paused = true)]
async fn test_image_replace_missing_pid() {
    let engine = engine();
    assert_eq!(
        engine.image_replace(12, "ghost", vec![0]),
        Err(ProcessError::NoSuchProcess(12))
    );
}

#[tokio::test(start_paused = true)]
async fn test_exec_picks_from_catalog() {
    let engine = classroom();
    let names: Vec<String> = (0..5).map(|_| engine.exec(4).unwrap().name).collect();
    assert_eq!(names, vec!["python", "node", "java", "firefox", "python"]);

    let gcc = engine.get(4).unwrap();
    assert_eq!(gcc.ppid, 2);
    assert_eq!(gcc.file_descriptors, vec![0, 1, 2, 7]);
}

#[tokio::test(start_paused = true)]
async fn test_exec_with_seed_is_reproducible() {
    let run = || {
        let engine = LifecycleEngine::builder()
            .with_topology(Topology::classroom())
            .with_exec_seed(11)
            .build()
            .unwrap();
        (0..6)
            .map(|_| engine.exec(2).unwrap().name)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[tokio::test(start_paused = true)]
async fn test_idempotent_reap() {
    let engine = classroom();

    // Never zombified: running and absent pids are both no-ops
    assert!(!engine.reap(3));
    assert!(!engine.reap(99));
    assert_eq!(engine.snapshot().len(), 4);

    engine.terminate(4).unwrap();
    assert!(engine.reap(4));
    let after_first = engine.snapshot();
    assert!(!engine.reap(4));
    assert_eq!(engine.snapshot(), after_first);

    // The scheduled reclamation later finds nothing to do
    tokio::time::sleep(engine.reap_delay() + Duration::from_millis(1)).await;
    let stats = engine.reclamation_stats();
    assert_eq!(stats.fired, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(engine.snapshot(), after_first);
}

#[tokio::test(start_paused = true)]
async fn test_protected_root() {
    let engine = classroom();
    let before = engine.snapshot();

    assert_eq!(
        engine.terminate(ROOT_PID),
        Err(ProcessError::Forbidden {
            pid: ROOT_PID,
            operation: Operation::Terminate
        })
    );
    assert_eq!(
        engine.image_replace(ROOT_PID, "evil", vec![0]),
        Err(ProcessError::Forbidden {
            pid: ROOT_PID,
            operation: Operation::ImageReplace
        })
    );
    assert!(matches!(
        engine.kill_parent_of(ROOT_PID),
        Err(ProcessError::Forbidden { .. })
    ));
    assert!(matches!(
        engine.exec(ROOT_PID),
        Err(ProcessError::Forbidden { .. })
    ));

    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.reclamation_stats().scheduled, 0);
}

#[tokio::test(start_paused = true)]
async fn test_kill_parent_of_child_of_root() {
    let engine = classroom();
    assert_eq!(
        engine.kill_parent_of(2),
        Err(ProcessError::NoKillableParent(2))
    );
    assert_eq!(engine.get(2).unwrap().status, ProcessStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn test_kill_parent_of_grandchild() {
    let engine = classroom();
    let report = engine.kill_parent_of(3).unwrap();

    assert_eq!(report.terminated_pid, 2);
    assert_eq!(report.orphaned_pids, vec![3, 4]);
    assert_eq!(engine.get(2).unwrap().status, ProcessStatus::Zombie);
}

#[tokio::test(start_paused = true)]
async fn test_kill_parent_of_unknown() {
    let engine = classroom();
    assert_eq!(
        engine.kill_parent_of(42),
        Err(ProcessError::NoSuchProcess(42))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stale_pid_after_reap() {
    let engine = classroom();
    let gcc = engine.get(4).unwrap();
    engine.terminate(gcc.pid).unwrap();
    tokio::time::sleep(engine.reap_delay() + Duration::from_millis(1)).await;

    assert_eq!(engine.spawn(gcc.pid), Err(ProcessError::NoSuchProcess(4)));
    assert_eq!(engine.terminate(gcc.pid), Err(ProcessError::NoSuchProcess(4)));
    assert!(engine.describe(gcc.pid).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_reclamations_fire_in_due_order() {
    let engine = LifecycleEngine::builder()
        .with_root(ProcessImage::new("init"))
        .with_reap_delay(Duration::from_millis(100))
        .build()
        .unwrap();
    let a = engine.spawn(ROOT_PID).unwrap().pid;
    let b = engine.spawn(ROOT_PID).unwrap().pid;

    engine.terminate(a).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    engine.terminate(b).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!engine.exists(a));
    assert!(engine.exists(b));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!engine.exists(b));
}

#[tokio::test(start_paused = true)]
async fn test_clones_share_registry() {
    let engine = engine();
    let other = engine.clone();

    let pid = other.spawn(ROOT_PID).unwrap().pid;
    assert!(engine.exists(pid));
}
