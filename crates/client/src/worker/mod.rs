//! Tiered HTTP cache.
//!
//! `ServiceWorker` intercepts GET traffic and answers it from one of four
//! partitions of the [`CacheDb`]:
//!
//! | partition | contents                  | strategy                          |
//! |-----------|---------------------------|-----------------------------------|
//! | static    | versioned app shell       | cache-first, background update    |
//! | api       | backend JSON              | stale-while-revalidate, FIFO cap  |
//! | image     | article thumbnails        | cache-first                       |
//! | tts       | synthesized speech        | cache-first on a synthetic key    |
//!
//! The static partition is named after the deployed version, so a new
//! version installs into a fresh partition and `activate` deletes the rest.

pub mod lifecycle;
pub mod message;
pub mod routing;
pub mod strategies;
pub mod tasks;
pub mod trim;
pub mod tts;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use url::Url;

use hypernews_core::{CacheDb, Error, WorkerConfig};

use crate::fetch::{self, Network, Request, Response};

pub use lifecycle::InstallReport;
pub use message::{PrefetchReport, WorkerMessage};
pub use routing::Route;
pub use tasks::BackgroundTasks;

/// Names of the partitions owned by one deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub static_assets: String,
    pub api: String,
    pub image: String,
    pub tts: String,
}

impl PartitionNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            static_assets: version.to_string(),
            api: "hypernews-api-v1".into(),
            image: "hypernews-img-v1".into(),
            tts: "hypernews-tts-v1".into(),
        }
    }

    /// Whether `name` belongs to the current version.
    pub fn is_current(&self, name: &str) -> bool {
        [&self.static_assets, &self.api, &self.image, &self.tts].iter().any(|current| *current == name)
    }
}

/// Outcome of intercepting a request.
#[derive(Debug)]
pub enum Interception {
    /// Not handled; the request goes to the network as-is.
    Passthrough(Request),
    Respond(Response),
}

/// The tiered HTTP cache manager. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ServiceWorker {
    db: CacheDb,
    network: Arc<dyn Network>,
    config: Arc<WorkerConfig>,
    origin: Url,
    partitions: Arc<PartitionNames>,
    tasks: Arc<BackgroundTasks>,
    controlling: Arc<AtomicBool>,
}

impl ServiceWorker {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: WorkerConfig, origin: Url) -> Self {
        let partitions = PartitionNames::for_version(&config.version);
        Self {
            db,
            network,
            config: Arc::new(config),
            origin,
            partitions: Arc::new(partitions),
            tasks: Arc::new(BackgroundTasks::new()),
            controlling: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn partitions(&self) -> &PartitionNames {
        &self.partitions
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// True once `activate` has completed.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    /// Wait for all background revalidation and prefetch work.
    pub async fn drain(&self) {
        self.tasks.drain().await;
    }

    /// Absolute URL for a site path.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        Ok(fetch::resolve(&self.origin, path)?)
    }

    /// The fetch hook: decide whether and how to answer `request`.
    ///
    /// Nothing is intercepted before activation.
    pub async fn handle_fetch(&self, request: Request) -> Interception {
        if !self.is_controlling() {
            return Interception::Passthrough(request);
        }

        match routing::classify(&request, &self.config.api_prefix) {
            Route::Passthrough => Interception::Passthrough(request),
            Route::Api => Interception::Respond(self.stale_while_revalidate(request).await),
            Route::Image => Interception::Respond(self.cache_first(request).await),
            Route::Static => Interception::Respond(self.cache_first_with_update(request).await),
        }
    }

    /// Fetch as the page would: intercepted requests never fail, the rest
    /// reach the network and surface its transport errors.
    pub async fn fetch(&self, request: Request) -> Result<Response, Error> {
        match self.handle_fetch(request).await {
            Interception::Respond(response) => Ok(response),
            Interception::Passthrough(request) => self.network.fetch(&request).await,
        }
    }

    /// Look up `key`, treating storage errors as a miss.
    async fn lookup(&self, partition: &str, key: &str) -> Option<Response> {
        match self.db.match_entry(partition, key).await {
            Ok(found) => found.map(Response::from_stored),
            Err(e) => {
                tracing::warn!(partition, key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Store a successful response. Returns whether it was written.
    async fn store(&self, partition: &str, key: &str, response: &Response) -> bool {
        if !response.is_success() {
            return false;
        }
        match self.db.put_entry(partition, key, &response.to_stored()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(partition, key, error = %e, "cache write failed");
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_partition_names() {
        let names = PartitionNames::for_version("hypernews-v17");
        assert!(names.is_current("hypernews-v17"));
        assert!(names.is_current("hypernews-api-v1"));
        assert!(names.is_current("hypernews-tts-v1"));
        assert!(!names.is_current("hypernews-v16"));
    }

    #[tokio::test]
    async fn test_not_intercepting_before_activation() {
        let (worker, network) = worker().await;
        network.respond(&url("/api/articles"), 200, "application/json", "[]");

        let request = Request::get(worker.resolve("/api/articles").unwrap());
        assert!(matches!(worker.handle_fetch(request.clone()).await, Interception::Passthrough(_)));

        let response = worker.fetch(request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(worker.db().entry_count(&worker.partitions().api).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_post_passes_through_untouched() {
        let (worker, network) = active_worker().await;
        network.respond(&url("/api/articles/ask"), 200, "application/json", r#"{"answer":"a"}"#);

        let request = Request::post_json(worker.resolve("/api/articles/ask").unwrap(), &serde_json::json!({})).unwrap();
        assert!(matches!(worker.handle_fetch(request.clone()).await, Interception::Passthrough(_)));

        let response = worker.fetch(request).await.unwrap();
        assert_eq!(response.text(), r#"{"answer":"a"}"#);
        assert_eq!(worker.db().entry_count(&worker.partitions().api).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_passthrough_surfaces_transport_errors() {
        let (worker, _network) = active_worker().await;
        let request = Request::post_json(worker.resolve("/api/tts").unwrap(), &serde_json::json!({})).unwrap();
        assert!(worker.fetch(request).await.is_err());
    }
}
