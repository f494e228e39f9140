use crate::runtime::{AgentRuntime, RuntimeConfig};
use crate::worker::WorkerLogic;
use calendor_store::Datastore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns the fleet of agent runtimes and their shared stop signal.
///
/// Built once at startup; `spawn_all` starts one poll loop per registered
/// worker and `shutdown` asks all of them to wind down. Join the returned
/// handles to wait for the stopped-status writes to land.
pub struct AgentRegistry {
    store: Datastore,
    config: RuntimeConfig,
    runtimes: Vec<Arc<AgentRuntime>>,
    stop_tx: watch::Sender<bool>,
}

impl AgentRegistry {
    pub fn new(store: Datastore, config: RuntimeConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            store,
            config,
            runtimes: Vec::new(),
            stop_tx,
        }
    }

    /// Register a worker, wrapping it in a runtime over the shared store.
    pub fn register(&mut self, worker: Arc<dyn WorkerLogic>) -> Arc<AgentRuntime> {
        let runtime = Arc::new(AgentRuntime::new(
            worker,
            self.store.clone(),
            self.config.clone(),
        ));
        self.runtimes.push(Arc::clone(&runtime));
        runtime
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.runtimes
            .iter()
            .map(|rt| rt.agent_id().to_string())
            .collect()
    }

    /// Spawn one poll loop per registered agent.
    pub fn spawn_all(&self) -> Vec<JoinHandle<()>> {
        tracing::info!(agent_count = self.runtimes.len(), "spawning agent fleet");
        self.runtimes
            .iter()
            .map(|runtime| {
                let runtime = Arc::clone(runtime);
                let stop = self.stop_tx.subscribe();
                tokio::spawn(async move { runtime.run(stop).await })
            })
            .collect()
    }

    /// Flip the stop signal; every spawned loop exits after its current
    /// cycle.
    pub fn shutdown(&self) {
        tracing::info!("shutting down agent fleet");
        let _ = self.stop_tx.send(true);
    }
}
