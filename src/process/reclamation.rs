/*!
 * Reclamation Scheduler - Delayed Zombie Reaping
 *
 * Background task that reaps zombies once their reclamation delay has
 * elapsed. Requests are kept in a due-time priority queue, so each one
 * fires on its own deadline regardless of the order it was issued in, and
 * a slow or early request never holds up the others.
 *
 * A scheduled reclamation cannot be cancelled. Shutting the task down stops
 * new requests but still lets every accepted request fire at its deadline.
 */

use crate::core::limits::PENDING_REAP_WARN_THRESHOLD;
use crate::core::types::Pid;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Target of delivered reclamations
///
/// Must be idempotent: the entry may already be gone when a request fires.
pub trait Reaper: Send + Sync + 'static {
    /// Remove `pid` if it is a zombie; returns whether an entry was removed
    fn reap(&self, pid: Pid) -> bool;
}

/// Control messages for the reclamation task
#[derive(Debug, Clone)]
enum ReclamationCommand {
    /// Reap `pid` at `due`
    Schedule { ticket: u64, pid: Pid, due: Instant },
    /// Stop accepting requests and exit once the queue is drained
    Shutdown,
}

/// A reclamation that has been accepted but has not fired yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReap {
    pub ticket: u64,
    pub pid: Pid,
    pub due: Instant,
}

impl PendingReap {
    /// Time left until this reclamation fires
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.due.saturating_duration_since(Instant::now())
    }
}

/// Point-in-time reclamation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReclamationStats {
    pub scheduled: u64,
    pub fired: u64,
    /// Fired and removed an entry
    pub reaped: u64,
    /// Fired but the entry was already gone (or not a zombie)
    pub skipped: u64,
    pub pending: usize,
}

/// Lock-free reclamation counters
#[derive(Debug, Default)]
struct AtomicReclamationStats {
    scheduled: AtomicU64,
    fired: AtomicU64,
    reaped: AtomicU64,
    skipped: AtomicU64,
}

impl AtomicReclamationStats {
    #[inline(always)]
    fn inc_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    fn dec_scheduled(&self) {
        self.scheduled.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline(always)]
    fn record_fired(&self, removed: bool) {
        self.fired.fetch_add(1, Ordering::Relaxed);
        if removed {
            self.reaped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self, pending: usize) -> ReclamationStats {
        ReclamationStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            pending,
        }
    }
}

type PendingMap = DashMap<u64, PendingReap, RandomState>;

/// Handle to the reclamation background task
pub struct ReclamationScheduler {
    command_tx: mpsc::UnboundedSender<ReclamationCommand>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    pending: Arc<PendingMap>,
    stats: Arc<AtomicReclamationStats>,
    next_ticket: AtomicU64,
    /// Held across the closed check and the send, so no request is ever
    /// queued behind `Shutdown`
    closed: Mutex<bool>,
}

impl ReclamationScheduler {
    /// Spawn the reclamation task on the current Tokio runtime
    pub fn spawn(reaper: Arc<dyn Reaper>) -> Self {
        Self::spawn_on(&tokio::runtime::Handle::current(), reaper)
    }

    /// Spawn the reclamation task on a specific runtime
    pub fn spawn_on(runtime: &tokio::runtime::Handle, reaper: Arc<dyn Reaper>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let pending: Arc<PendingMap> = Arc::new(DashMap::with_hasher(RandomState::new()));
        let stats = Arc::new(AtomicReclamationStats::default());

        let handle = runtime.spawn(run_reclamation_loop(
            reaper,
            Arc::clone(&pending),
            Arc::clone(&stats),
            command_rx,
        ));

        info!("Reclamation task spawned");

        Self {
            command_tx,
            handle: Mutex::new(Some(handle)),
            pending,
            stats,
            next_ticket: AtomicU64::new(1),
            closed: Mutex::new(false),
        }
    }

    /// Register a one-shot reap of `pid` after `delay`
    ///
    /// Never blocks. Returns `false` only after shutdown has been requested.
    pub fn schedule_reap(&self, pid: Pid, delay: Duration) -> bool {
        let closed = self.closed.lock();
        if *closed {
            warn!(pid, "Reclamation scheduler is shut down, request rejected");
            return false;
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let due = Instant::now() + delay;
        let request = PendingReap { ticket, pid, due };

        // Counted before the send so a fast reap never outruns the count
        self.pending.insert(ticket, request);
        self.stats.inc_scheduled();
        if self
            .command_tx
            .send(ReclamationCommand::Schedule { ticket, pid, due })
            .is_err()
        {
            self.pending.remove(&ticket);
            self.stats.dec_scheduled();
            warn!(pid, "Reclamation task is gone, request rejected");
            return false;
        }
        drop(closed);

        let pending = self.pending.len();
        if pending > PENDING_REAP_WARN_THRESHOLD {
            warn!(pending, "Large reclamation backlog");
        }
        debug!(pid, ticket, delay_ms = delay.as_millis() as u64, "Reclamation scheduled");
        true
    }

    /// Accepted reclamations that have not fired, soonest first
    pub fn pending(&self) -> Vec<PendingReap> {
        let mut pending: Vec<PendingReap> = self.pending.iter().map(|e| *e.value()).collect();
        pending.sort_by_key(|p| (p.due, p.ticket));
        pending
    }

    /// Whether a reclamation for `pid` is still waiting to fire
    pub fn is_pending(&self, pid: Pid) -> bool {
        self.pending.iter().any(|e| e.value().pid == pid)
    }

    pub fn stats(&self) -> ReclamationStats {
        self.stats.snapshot(self.pending.len())
    }

    /// Stop accepting requests and wait for every accepted one to fire
    pub async fn shutdown(&self) {
        {
            let mut closed = self.closed.lock();
            *closed = true;
            let _ = self.command_tx.send(ReclamationCommand::Shutdown);
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Reclamation task shutdown error: {}", e);
            } else {
                info!("Reclamation task shutdown complete");
            }
        }
    }
}

impl Drop for ReclamationScheduler {
    fn drop(&mut self) {
        // The task keeps running until its queue drains
        *self.closed.get_mut() = true;
        if self.handle.get_mut().is_some() {
            let _ = self.command_tx.send(ReclamationCommand::Shutdown);
        }
    }
}

/// Core reclamation loop
async fn run_reclamation_loop(
    reaper: Arc<dyn Reaper>,
    pending: Arc<PendingMap>,
    stats: Arc<AtomicReclamationStats>,
    mut command_rx: mpsc::UnboundedReceiver<ReclamationCommand>,
) {
    let mut queue: BinaryHeap<Reverse<(Instant, u64, Pid)>> = BinaryHeap::new();
    let mut draining = false;

    loop {
        if draining && queue.is_empty() {
            break;
        }

        let next_due = queue.peek().map(|Reverse((due, _, _))| *due);

        tokio::select! {
            _ = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                let now = Instant::now();
                while let Some(Reverse((due, ticket, pid))) = queue.peek().copied() {
                    if due > now {
                        break;
                    }
                    queue.pop();
                    pending.remove(&ticket);

                    let removed = reaper.reap(pid);
                    stats.record_fired(removed);
                    debug!(pid, ticket, removed, "Reclamation fired");
                }
            }

            cmd = command_rx.recv(), if !draining => {
                match cmd {
                    Some(ReclamationCommand::Schedule { ticket, pid, due }) => {
                        queue.push(Reverse((due, ticket, pid)));
                    }
                    Some(ReclamationCommand::Shutdown) | None => {
                        // Anything already in the channel was accepted
                        command_rx.close();
                        while let Ok(cmd) = command_rx.try_recv() {
                            if let ReclamationCommand::Schedule { ticket, pid, due } = cmd {
                                queue.push(Reverse((due, ticket, pid)));
                            }
                        }
                        info!(remaining = queue.len(), "Reclamation task draining");
                        draining = true;
                    }
                }
            }
        }
    }
}
