//! Shared state behind every tool call.

use std::sync::{Arc, Mutex, MutexGuard};

use hypernews_client::ServiceWorker;
use hypernews_core::Ledger;

/// Ledger plus tiered cache, shared by clones of the server handler.
///
/// The ledger lock is only held between awaits, never across one.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Mutex<Ledger>>,
    worker: ServiceWorker,
}

impl AppState {
    pub fn new(ledger: Ledger, worker: ServiceWorker) -> Self {
        Self { ledger: Arc::new(Mutex::new(ledger)), worker }
    }

    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn worker(&self) -> &ServiceWorker {
        &self.worker
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use hypernews_client::ScriptedNetwork;
    use hypernews_core::ledger::MemoryStore;
    use hypernews_core::{CacheDb, LedgerConfig, WorkerConfig};

    pub const ORIGIN: &str = "https://news.example";

    pub fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    /// State with an activated worker (empty shell manifest) and a fresh
    /// in-memory ledger.
    pub async fn state() -> (AppState, Arc<ScriptedNetwork>) {
        state_with(LedgerConfig::default()).await
    }

    pub async fn state_with(ledger_config: LedgerConfig) -> (AppState, Arc<ScriptedNetwork>) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(ScriptedNetwork::new());
        let config = WorkerConfig { static_assets: Vec::new(), ..WorkerConfig::default() };
        let worker = ServiceWorker::new(db, network.clone(), config, url::Url::parse(ORIGIN).unwrap());
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let ledger = Ledger::load(ledger_config, MemoryStore::new());
        (AppState::new(ledger, worker), network)
    }
}
