/*!
 * Lifecycle Engine
 *
 * Spawn, image replacement, termination, orphan adoption and reaping as
 * atomic transitions over the process registry.
 *
 * # State machine
 *
 * ```text
 * spawn ──▶ running ──terminate──▶ zombie ──reap──▶ (removed)
 *             ▲   │
 *             └───┘ image_replace
 * ```
 *
 * Every mutating operation takes the registry write lock once and applies
 * all of its effects before releasing it, so no observer ever sees a zombie
 * whose children have not been adopted yet, or an adopted child whose old
 * parent is already gone. Lifecycle events are published after the lock is
 * released.
 */

use crate::core::errors::{Operation, ProcessError, ProcessResult};
use crate::core::limits::CHILD_NAME_PREFIX;
use crate::core::types::{Fd, Pid, ROOT_PID};
use crate::monitoring::events::{EventBus, LifecycleEvent};
use crate::monitoring::tracer::span_operation;
use crate::process::invariants::{check_all_invariants, InvariantViolation};
use crate::process::programs::{ProgramCatalog, ProgramChooser};
use crate::process::reclamation::{PendingReap, Reaper, ReclamationScheduler, ReclamationStats};
use crate::process::registry::ProcessRegistry;
use crate::process::types::{
    normalize_fds, ChildSummary, Process, ProcessDetails, ProcessStatus, SystemStatus,
    TerminationReport,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Registry plus event fan-out, shared with the reclamation task
pub(crate) struct EngineState {
    registry: RwLock<ProcessRegistry>,
    events: EventBus,
}

impl EngineState {
    pub(crate) fn new(registry: ProcessRegistry, events: EventBus) -> Self {
        Self {
            registry: RwLock::new(registry),
            events,
        }
    }

    /// Remove `pid` if it is a zombie; anything else is a silent no-op
    fn reap_zombie(&self, pid: Pid) -> bool {
        let removed = {
            let mut registry = self.registry.write();
            let is_zombie = registry.get(pid).map(Process::is_zombie).unwrap_or(false);
            if is_zombie {
                let removed = registry.remove(pid).is_ok();
                verify(&registry);
                removed
            } else {
                false
            }
        };

        if removed {
            info!(pid, "Reaped zombie process");
            self.events.publish(LifecycleEvent::Reaped { pid });
        } else {
            debug!(pid, "Reap skipped, no zombie with this PID");
        }
        removed
    }
}

impl Reaper for EngineState {
    fn reap(&self, pid: Pid) -> bool {
        self.reap_zombie(pid)
    }
}

/// The lifecycle engine
///
/// Cheap to clone; clones share the same registry and reclamation task.
#[derive(Clone)]
pub struct LifecycleEngine {
    state: Arc<EngineState>,
    scheduler: Arc<ReclamationScheduler>,
    catalog: Arc<ProgramCatalog>,
    chooser: Arc<Mutex<Box<dyn ProgramChooser>>>,
    reap_delay: Duration,
}

impl LifecycleEngine {
    /// Create a builder for constructing a LifecycleEngine
    pub fn builder() -> super::builder::LifecycleEngineBuilder {
        super::builder::LifecycleEngineBuilder::new()
    }

    pub(crate) fn from_parts(
        state: Arc<EngineState>,
        scheduler: Arc<ReclamationScheduler>,
        catalog: ProgramCatalog,
        chooser: Box<dyn ProgramChooser>,
        reap_delay: Duration,
    ) -> Self {
        Self {
            state,
            scheduler,
            catalog: Arc::new(catalog),
            chooser: Arc::new(Mutex::new(chooser)),
            reap_delay,
        }
    }

    /// Fork `parent_pid`: the child copies its descriptors, environment and
    /// working directory and is named `child_<parent name>`
    pub fn spawn(&self, parent_pid: Pid) -> ProcessResult<Process> {
        let span = span_operation("spawn", parent_pid);
        let _entered = span.enter();

        let result = {
            let mut registry = self.state.registry.write();
            spawn_locked(&mut registry, parent_pid)
        };
        span.record_outcome(&result);

        let child = result?;
        info!(
            pid = child.pid,
            ppid = child.ppid,
            name = %child.name,
            "fork() created process"
        );
        self.state.events.publish(LifecycleEvent::Spawned {
            pid: child.pid,
            ppid: child.ppid,
            name: child.name.clone(),
        });
        Ok(child)
    }

    /// Replace the program image of `pid`, keeping its identity
    ///
    /// `pid`, `ppid`, environment and working directory are untouched.
    pub fn image_replace(
        &self,
        pid: Pid,
        new_name: impl Into<String>,
        new_fds: Vec<Fd>,
    ) -> ProcessResult<Process> {
        let span = span_operation("image_replace", pid);
        let _entered = span.enter();
        let new_name = new_name.into();

        let result = {
            let mut registry = self.state.registry.write();
            image_replace_locked(&mut registry, pid, new_name, new_fds)
        };
        span.record_outcome(&result);

        let process = result?;
        info!(pid, name = %process.name, "exec() replaced process image");
        self.state.events.publish(LifecycleEvent::ImageReplaced {
            pid,
            name: process.name.clone(),
        });
        Ok(process)
    }

    /// Replace the image of `pid` with a program picked from the catalog
    pub fn exec(&self, pid: Pid) -> ProcessResult<Process> {
        // Validate before consuming a choice
        {
            let registry = self.state.registry.read();
            check_replaceable(&registry, pid)?;
        }

        let program = {
            let mut chooser = self.chooser.lock();
            self.catalog.pick(&mut **chooser).clone()
        };

        self.image_replace(pid, program.name, program.file_descriptors)
    }

    /// Terminate `pid`: mark it zombie, hand its children to the root and
    /// schedule its reclamation
    pub fn terminate(&self, pid: Pid) -> ProcessResult<TerminationReport> {
        let span = span_operation("terminate", pid);
        let _entered = span.enter();

        let result = {
            let mut registry = self.state.registry.write();
            self.terminate_locked(&mut registry, pid)
        };
        span.record_outcome(&result);

        let (report, adoptions) = result?;
        self.announce_termination(&report, adoptions);
        Ok(report)
    }

    /// Terminate the parent of `pid`
    ///
    /// Fails with `NoKillableParent` when the parent is the root.
    pub fn kill_parent_of(&self, pid: Pid) -> ProcessResult<TerminationReport> {
        let span = span_operation("kill_parent_of", pid);
        let _entered = span.enter();

        let result = {
            let mut registry = self.state.registry.write();
            self.kill_parent_locked(&mut registry, pid)
        };
        span.record_outcome(&result);

        let (report, adoptions) = result?;
        self.announce_termination(&report, adoptions);
        Ok(report)
    }

    /// Remove `pid` if it is a zombie
    ///
    /// Idempotent: an absent or running pid is a no-op, never an error.
    /// Returns whether an entry was removed.
    pub fn reap(&self, pid: Pid) -> bool {
        self.state.reap_zombie(pid)
    }

    /// Copy of the process with `pid`
    pub fn get(&self, pid: Pid) -> ProcessResult<Process> {
        self.state
            .registry
            .read()
            .get(pid)
            .cloned()
            .map_err(ProcessError::from)
    }

    /// Whether `pid` is currently in the registry (live or zombie)
    pub fn exists(&self, pid: Pid) -> bool {
        self.state.registry.read().contains(pid)
    }

    /// Copies of the children of `pid`, ascending; empty if none
    pub fn children_of(&self, pid: Pid) -> Vec<Process> {
        self.state
            .registry
            .read()
            .children_of(pid)
            .cloned()
            .collect()
    }

    /// Immutable list of all current processes, ordered by pid
    pub fn snapshot(&self) -> Vec<Process> {
        self.state.registry.read().snapshot()
    }

    /// First process with `name`, in pid order
    pub fn find_by_name(&self, name: &str) -> Option<Process> {
        self.state.registry.read().find_by_name(name).cloned()
    }

    /// Details panel data for `pid`
    pub fn describe(&self, pid: Pid) -> ProcessResult<ProcessDetails> {
        let registry = self.state.registry.read();
        let process = registry.get(pid)?.clone();
        let parent_name = registry.get(process.ppid).ok().map(|p| p.name.clone());
        let children = registry.children_of(pid).map(ChildSummary::from).collect();

        Ok(ProcessDetails {
            process,
            parent_name,
            children,
        })
    }

    /// Zombie and orphan counters
    pub fn status(&self) -> SystemStatus {
        let registry = self.state.registry.read();
        registry
            .iter()
            .fold(SystemStatus::default(), |mut status, process| {
                if process.is_zombie() {
                    status.zombies += 1;
                }
                if process.orphaned {
                    status.orphans += 1;
                }
                status
            })
    }

    /// Violations of the registry invariants (empty when healthy)
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        check_all_invariants(&self.state.registry.read())
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.state.events.subscribe()
    }

    /// Reclamations waiting to fire, soonest first
    pub fn pending_reclamations(&self) -> Vec<PendingReap> {
        self.scheduler.pending()
    }

    pub fn reclamation_stats(&self) -> ReclamationStats {
        self.scheduler.stats()
    }

    /// Delay applied to every reclamation
    #[inline]
    #[must_use]
    pub fn reap_delay(&self) -> Duration {
        self.reap_delay
    }

    /// Stop the reclamation task after every pending reclamation has fired
    ///
    /// Later `terminate` and `kill_parent_of` calls fail with
    /// [`ProcessError::ReclamationClosed`] and change nothing.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    fn kill_parent_locked(
        &self,
        registry: &mut ProcessRegistry,
        pid: Pid,
    ) -> ProcessResult<(TerminationReport, Vec<(Pid, Pid)>)> {
        if pid == ROOT_PID {
            return Err(ProcessError::Forbidden {
                pid,
                operation: Operation::KillParent,
            });
        }

        let ppid = registry.get(pid)?.ppid;
        if ppid == ROOT_PID {
            return Err(ProcessError::NoKillableParent(pid));
        }

        self.terminate_locked(registry, ppid)
    }

    /// Zombie-marking, adoption and reclamation scheduling as one step
    ///
    /// Returns the report and the `(child, previous parent)` adoptions.
    fn terminate_locked(
        &self,
        registry: &mut ProcessRegistry,
        pid: Pid,
    ) -> ProcessResult<(TerminationReport, Vec<(Pid, Pid)>)> {
        if pid == ROOT_PID {
            return Err(ProcessError::Forbidden {
                pid,
                operation: Operation::Terminate,
            });
        }

        let target = registry.get(pid)?;
        if !target.is_running() {
            return Err(ProcessError::NotRunning {
                pid,
                status: target.status,
            });
        }

        // Scheduled before any mutation: a rejected request leaves the
        // registry untouched. The reap cannot fire early since it needs the
        // write lock held here.
        if !self.scheduler.schedule_reap(pid, self.reap_delay) {
            warn!(pid, "Reclamation is shut down, termination rejected");
            return Err(ProcessError::ReclamationClosed(pid));
        }

        let orphaned_pids = registry.child_pids(pid);

        registry.get_mut(pid)?.status = ProcessStatus::Zombie;
        for &child in &orphaned_pids {
            let process = registry.get_mut(child)?;
            process.ppid = ROOT_PID;
            process.orphaned = true;
        }
        verify(registry);

        let adoptions = orphaned_pids.iter().map(|&child| (child, pid)).collect();
        Ok((
            TerminationReport {
                terminated_pid: pid,
                orphaned_pids,
            },
            adoptions,
        ))
    }

    fn announce_termination(&self, report: &TerminationReport, adoptions: Vec<(Pid, Pid)>) {
        info!(
            pid = report.terminated_pid,
            orphans = report.orphaned_pids.len(),
            "Process terminated, now a zombie"
        );
        self.state.events.publish(LifecycleEvent::Terminated {
            pid: report.terminated_pid,
        });

        for (child, previous_ppid) in adoptions {
            info!(pid = child, "Orphan adopted by init (PID 1)");
            self.state.events.publish(LifecycleEvent::Adopted {
                pid: child,
                previous_ppid,
            });
        }
    }
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("processes", &self.state.registry.read().len())
            .field("reap_delay", &self.reap_delay)
            .field("catalog", &self.catalog.len())
            .finish()
    }
}

fn spawn_locked(registry: &mut ProcessRegistry, parent_pid: Pid) -> ProcessResult<Process> {
    let parent = registry.get(parent_pid)?;
    if !parent.is_running() {
        return Err(ProcessError::NotRunning {
            pid: parent_pid,
            status: parent.status,
        });
    }

    let name = format!("{CHILD_NAME_PREFIX}{}", parent.name);
    let pid = registry.next_pid();
    let child = registry.get(parent_pid)?.forked(pid, name);

    registry.insert(child.clone())?;
    verify(registry);
    Ok(child)
}

fn check_replaceable(registry: &ProcessRegistry, pid: Pid) -> ProcessResult<()> {
    if pid == ROOT_PID {
        return Err(ProcessError::Forbidden {
            pid,
            operation: Operation::ImageReplace,
        });
    }

    let process = registry.get(pid)?;
    if !process.is_running() {
        return Err(ProcessError::NotRunning {
            pid,
            status: process.status,
        });
    }
    Ok(())
}

fn image_replace_locked(
    registry: &mut ProcessRegistry,
    pid: Pid,
    new_name: String,
    new_fds: Vec<Fd>,
) -> ProcessResult<Process> {
    check_replaceable(registry, pid)?;

    let process = registry.get_mut(pid)?;
    process.name = new_name;
    process.file_descriptors = normalize_fds(new_fds);
    Ok(process.clone())
}

/// Debug-build check that a mutation left the registry consistent
#[inline]
fn verify(registry: &ProcessRegistry) {
    if cfg!(debug_assertions) {
        let violations = check_all_invariants(registry);
        for violation in &violations {
            error!(%violation, "Registry invariant violated");
        }
        debug_assert!(violations.is_empty(), "registry invariants violated");
    }
}
