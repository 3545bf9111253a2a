/*!
 * Process Registry
 *
 * Authoritative in-memory table of every live and zombie process.
 *
 * The parent/child relation is stored only as the `ppid` back-reference;
 * children are computed on demand. PIDs come from a counter that only moves
 * forward, so an identifier is never handed out twice, even after its
 * process has been reaped.
 *
 * The registry performs no I/O and never blocks. It is not synchronized:
 * the engine owns it behind a single lock and is the only writer.
 */

use crate::core::errors::{Operation, RegistryError, RegistryResult};
use crate::core::types::{Pid, FIRST_CHILD_PID, NO_PARENT, ROOT_PID};
use crate::process::types::{Process, ProcessImage};
use std::collections::BTreeMap;
use tracing::trace;

/// Process table keyed by pid
#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    processes: BTreeMap<Pid, Process>,
    next_pid: Pid,
}

impl ProcessRegistry {
    /// Create a registry holding only the root process
    ///
    /// This is the single place the root is created, so there is exactly one
    /// pid-1 entry for the registry's whole lifetime.
    pub fn create_root(image: ProcessImage) -> Self {
        let root = Process::root(image);
        trace!(pid = ROOT_PID, name = %root.name, "root process created");

        let mut processes = BTreeMap::new();
        processes.insert(ROOT_PID, root);

        Self {
            processes,
            next_pid: FIRST_CHILD_PID,
        }
    }

    /// Issue a fresh pid, strictly greater than every pid issued before
    pub fn next_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    /// The pid the next call to [`next_pid`](Self::next_pid) will return
    #[inline]
    #[must_use]
    pub fn peek_next_pid(&self) -> Pid {
        self.next_pid
    }

    /// Add a new entry
    ///
    /// Fails with `DuplicatePid` if the pid is already present, and with
    /// `NotFound` if the parent it references does not exist.
    pub fn insert(&mut self, process: Process) -> RegistryResult<()> {
        if self.processes.contains_key(&process.pid) {
            return Err(RegistryError::DuplicatePid(process.pid));
        }
        if process.ppid != NO_PARENT && !self.processes.contains_key(&process.ppid) {
            return Err(RegistryError::NotFound(process.ppid));
        }

        trace!(pid = process.pid, ppid = process.ppid, name = %process.name, "process inserted");
        self.processes.insert(process.pid, process);
        Ok(())
    }

    pub fn get(&self, pid: Pid) -> RegistryResult<&Process> {
        self.processes.get(&pid).ok_or(RegistryError::NotFound(pid))
    }

    pub(crate) fn get_mut(&mut self, pid: Pid) -> RegistryResult<&mut Process> {
        self.processes
            .get_mut(&pid)
            .ok_or(RegistryError::NotFound(pid))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Processes whose `ppid` is `pid`, in ascending pid order
    ///
    /// Empty when `pid` has no children or does not exist.
    pub fn children_of(&self, pid: Pid) -> impl Iterator<Item = &Process> + '_ {
        self.processes.values().filter(move |p| p.ppid == pid)
    }

    /// Pids of the children of `pid`, ascending
    pub fn child_pids(&self, pid: Pid) -> Vec<Pid> {
        self.children_of(pid).map(|p| p.pid).collect()
    }

    /// Delete an entry
    ///
    /// The caller is responsible for moving the entry's children elsewhere
    /// first; the engine only removes zombies, which never have children.
    pub fn remove(&mut self, pid: Pid) -> RegistryResult<Process> {
        if pid == ROOT_PID {
            return Err(RegistryError::Forbidden {
                pid,
                operation: Operation::Remove,
            });
        }

        let removed = self
            .processes
            .remove(&pid)
            .ok_or(RegistryError::NotFound(pid))?;
        debug_assert!(
            self.children_of(pid).next().is_none(),
            "removed process {pid} still had children"
        );
        trace!(pid, name = %removed.name, "process removed");
        Ok(removed)
    }

    /// Iterate over all processes in pid order
    pub fn iter(&self) -> impl Iterator<Item = &Process> + '_ {
        self.processes.values()
    }

    /// Immutable copy of every current process, ordered by pid
    pub fn snapshot(&self) -> Vec<Process> {
        self.processes.values().cloned().collect()
    }

    /// Number of entries (live and zombie)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Always false: the root is never removed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// First process with the given name, in pid order
    pub fn find_by_name(&self, name: &str) -> Option<&Process> {
        self.processes.values().find(|p| p.name == name)
    }
}
