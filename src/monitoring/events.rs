/*!
 * Lifecycle Events
 * Typed notifications the presentation layer renders as messages
 */

use crate::core::types::Pid;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Something that happened to a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Spawned { pid: Pid, ppid: Pid, name: String },
    ImageReplaced { pid: Pid, name: String },
    Terminated { pid: Pid },
    Adopted { pid: Pid, previous_ppid: Pid },
    Reaped { pid: Pid },
}

impl LifecycleEvent {
    /// Pid the event is about
    #[inline]
    #[must_use]
    pub const fn pid(&self) -> Pid {
        match self {
            LifecycleEvent::Spawned { pid, .. }
            | LifecycleEvent::ImageReplaced { pid, .. }
            | LifecycleEvent::Terminated { pid }
            | LifecycleEvent::Adopted { pid, .. }
            | LifecycleEvent::Reaped { pid } => *pid,
        }
    }
}

/// Fan-out of lifecycle events
///
/// Publishing never fails: with no subscribers the event is dropped, and a
/// subscriber that falls more than `capacity` events behind skips ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: LifecycleEvent) {
        trace!(?event, "lifecycle event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
