/*!
 * Lifecycle Engine Builder
 * Seeds the registry from a topology and starts the reclamation task
 */

use crate::core::config::KernelConfig;
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::limits::{DEFAULT_EVENT_CAPACITY, DEFAULT_REAP_DELAY};
use crate::core::types::{Pid, ROOT_PID};
use crate::monitoring::events::EventBus;
use crate::process::engine::{EngineState, LifecycleEngine};
use crate::process::programs::{ProgramCatalog, ProgramChooser, RandomChooser};
use crate::process::reclamation::{Reaper, ReclamationScheduler};
use crate::process::registry::ProcessRegistry;
use crate::process::topology::Topology;
use crate::process::types::{Process, ProcessImage};
use ahash::AHashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builder for LifecycleEngine
pub struct LifecycleEngineBuilder {
    topology: Topology,
    reap_delay: Duration,
    catalog: ProgramCatalog,
    chooser: Option<Box<dyn ProgramChooser>>,
    exec_seed: Option<u64>,
    event_capacity: usize,
}

impl LifecycleEngineBuilder {
    /// Create a new builder: root only, default delay and catalog
    pub fn new() -> Self {
        Self {
            topology: Topology::default(),
            reap_delay: DEFAULT_REAP_DELAY,
            catalog: ProgramCatalog::default(),
            chooser: None,
            exec_seed: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Take delay, exec seed and event capacity from a configuration
    pub fn from_config(config: &KernelConfig) -> Self {
        let mut builder = Self::new()
            .with_reap_delay(config.reap_delay)
            .with_event_capacity(config.event_capacity);
        builder.exec_seed = config.exec_seed;
        builder
    }

    /// Seed the registry with this topology
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Replace the root image, keeping any seeded descendants
    pub fn with_root(mut self, root: ProcessImage) -> Self {
        self.topology.root = root;
        self
    }

    /// Delay between termination and reclamation
    pub fn with_reap_delay(mut self, delay: Duration) -> Self {
        self.reap_delay = delay;
        self
    }

    /// Programs `exec` chooses from
    pub fn with_catalog(mut self, catalog: ProgramCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Choice function for `exec` (overrides any seed)
    pub fn with_chooser<C: ProgramChooser + 'static>(mut self, chooser: C) -> Self {
        self.chooser = Some(Box::new(chooser));
        self
    }

    /// Seed the default random chooser
    pub fn with_exec_seed(mut self, seed: u64) -> Self {
        self.exec_seed = Some(seed);
        self
    }

    /// Lifecycle event buffer size
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Build on the current Tokio runtime
    pub fn build(self) -> ProcessResult<LifecycleEngine> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ProcessError::RuntimeUnavailable)?;
        self.build_on(&runtime)
    }

    /// Build, running the reclamation task on `runtime`
    pub fn build_on(self, runtime: &tokio::runtime::Handle) -> ProcessResult<LifecycleEngine> {
        let registry = seed_registry(self.topology)?;
        let seeded = registry.len();

        let state = Arc::new(EngineState::new(registry, EventBus::new(self.event_capacity)));
        let reaper: Arc<dyn Reaper> = state.clone();
        let scheduler = Arc::new(ReclamationScheduler::spawn_on(runtime, reaper));

        let chooser = match (self.chooser, self.exec_seed) {
            (Some(chooser), _) => chooser,
            (None, Some(seed)) => Box::new(RandomChooser::seeded(seed)) as Box<dyn ProgramChooser>,
            (None, None) => Box::new(RandomChooser::from_entropy()),
        };

        info!(
            processes = seeded,
            reap_delay_ms = self.reap_delay.as_millis() as u64,
            programs = self.catalog.len(),
            "Lifecycle engine initialized"
        );

        Ok(LifecycleEngine::from_parts(
            state,
            scheduler,
            self.catalog,
            chooser,
            self.reap_delay,
        ))
    }
}

impl Default for LifecycleEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the root and insert every descendant under its named parent
///
/// A later seed with a repeated name shadows the earlier one for lookups.
fn seed_registry(topology: Topology) -> ProcessResult<ProcessRegistry> {
    let mut names: AHashMap<String, Pid> = AHashMap::new();
    names.insert(topology.root.name.clone(), ROOT_PID);

    let mut registry = ProcessRegistry::create_root(topology.root);

    for seed in topology.descendants {
        let ppid = *names.get(&seed.parent).ok_or_else(|| {
            ProcessError::InvalidTopology(format!(
                "parent {:?} of {:?} was not seeded before it",
                seed.parent, seed.image.name
            ))
        })?;

        let pid = registry.next_pid();
        names.insert(seed.image.name.clone(), pid);
        registry.insert(Process::from_image(pid, ppid, seed.image))?;
    }

    Ok(registry)
}
