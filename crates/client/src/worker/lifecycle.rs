//! Install and activate.
//!
//! Install pre-caches the shell manifest into the version's static
//! partition, all or nothing. Activate garbage-collects every partition not
//! owned by the current version and starts intercepting requests.

use std::sync::atomic::Ordering;

use hypernews_core::Error;

use super::ServiceWorker;
use crate::fetch::{Request, Response};

/// What `install` stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub partition: String,
    pub assets: usize,
}

impl ServiceWorker {
    /// Pre-cache every shell asset.
    ///
    /// Every asset is fetched before anything is written, so a failed
    /// install leaves no partial static partition behind.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let partition = self.partitions.static_assets.clone();
        let mut fetched: Vec<(String, Response)> = Vec::with_capacity(self.config.static_assets.len());

        for asset in &self.config.static_assets {
            let url = self
                .resolve(asset)
                .map_err(|e| Error::InstallFailed(format!("{asset}: {e}")))?;
            let request = Request::get(url);
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{asset}: {e}")))?;
            if !response.is_success() {
                return Err(Error::InstallFailed(format!("{asset}: HTTP {}", response.status)));
            }
            fetched.push((request.cache_key(), response));
        }

        self.db.open_partition(&partition).await?;
        for (key, response) in &fetched {
            self.db.put_entry(&partition, key, &response.to_stored()).await?;
        }

        tracing::info!(partition = %partition, assets = fetched.len(), "installed shell");
        Ok(InstallReport { partition, assets: fetched.len() })
    }

    /// Delete stale partitions and take control of requests.
    ///
    /// Refuses to activate a version whose install never completed.
    /// Returns the names of the deleted partitions.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let partition = &self.partitions.static_assets;
        let installed = self.db.partition_names().await?.iter().any(|name| name == partition);
        if !installed {
            return Err(Error::InstallFailed(format!("{partition} is not installed")));
        }
        if !self.config.static_assets.is_empty() && self.db.entry_count(partition).await? == 0 {
            return Err(Error::InstallFailed(format!("{partition} is empty")));
        }

        let mut removed = Vec::new();
        for name in self.db.partition_names().await? {
            if self.partitions.is_current(&name) {
                continue;
            }
            if self.db.delete_partition(&name).await? {
                removed.push(name);
            }
        }

        self.controlling.store(true, Ordering::SeqCst);
        tracing::info!(partition = %partition, removed = ?removed, "activated");
        Ok(removed)
    }

    /// Install, then activate.
    ///
    /// A failed install still activates the version when an earlier run
    /// installed it completely, so an offline restart keeps serving from
    /// the cache. When activation is refused too, the install error is
    /// returned and requests keep passing through.
    pub async fn start(&self) -> Result<Vec<String>, Error> {
        match self.install().await {
            Ok(_) => self.activate().await,
            Err(install_err) => {
                tracing::warn!(error = %install_err, "install failed, trying the installed shell");
                self.activate().await.map_err(|activate_err| {
                    tracing::debug!(error = %activate_err, "no installed shell to activate");
                    install_err
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use std::sync::Arc;

    use hypernews_core::StoredResponse;

    use crate::fetch::ScriptedNetwork;

    use super::*;

    #[tokio::test]
    async fn test_install_stores_every_asset() {
        let (worker, network) = worker().await;
        network.respond(&url("/"), 200, "text/html", "home");
        network.respond(&url("/offline.html"), 200, "text/html", "offline");

        let report = worker.install().await.unwrap();
        assert_eq!(report.assets, 2);
        assert_eq!(report.partition, "hypernews-v17");
        assert_eq!(worker.db().entry_count("hypernews-v17").await.unwrap(), 2);
        assert!(!worker.is_controlling());
    }

    #[tokio::test]
    async fn test_install_fails_on_unreachable_asset() {
        let (worker, network) = worker().await;
        network.respond(&url("/"), 200, "text/html", "home");
        network.fail(&url("/offline.html"));

        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed(_)));
        assert_eq!(worker.db().entry_count("hypernews-v17").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let (worker, network) = worker().await;
        network.respond(&url("/"), 200, "text/html", "home");
        network.respond(&url("/offline.html"), 404, "text/html", "missing");

        assert!(matches!(worker.install().await, Err(Error::InstallFailed(_))));
    }

    #[tokio::test]
    async fn test_activate_refuses_failed_install() {
        let (worker, network) = worker().await;
        network.fail(&url("/"));
        assert!(worker.install().await.is_err());

        assert!(matches!(worker.activate().await, Err(Error::InstallFailed(_))));
        assert!(!worker.is_controlling());
    }

    #[tokio::test]
    async fn test_activate_deletes_old_partitions() {
        let (worker, network) = worker().await;
        let stale = StoredResponse::new(200, None, Vec::new(), b"old".to_vec());
        worker.db().put_entry("hypernews-v16", "GET https://news.example/", &stale).await.unwrap();
        worker.db().put_entry("hypernews-api-v1", "GET https://news.example/api/x", &stale).await.unwrap();

        network.respond(&url("/"), 200, "text/html", "home");
        network.respond(&url("/offline.html"), 200, "text/html", "offline");
        worker.install().await.unwrap();

        let removed = worker.activate().await.unwrap();
        assert_eq!(removed, vec!["hypernews-v16".to_string()]);
        assert!(worker.is_controlling());

        let names = worker.db().partition_names().await.unwrap();
        assert!(names.contains(&"hypernews-v17".to_string()));
        assert!(names.contains(&"hypernews-api-v1".to_string()));
        assert!(!names.contains(&"hypernews-v16".to_string()));
    }

    #[tokio::test]
    async fn test_start_offline_over_installed_version() {
        let (first, network) = worker().await;
        network.respond(&url("/"), 200, "text/html", "<main>home</main>");
        network.respond(&url("/offline.html"), 200, "text/html", "<main>offline</main>");
        first.start().await.unwrap();

        let offline = Arc::new(ScriptedNetwork::new());
        let restarted = ServiceWorker::new(
            first.db().clone(),
            offline.clone(),
            first.config().clone(),
            url::Url::parse(ORIGIN).unwrap(),
        );
        assert!(restarted.install().await.is_err());

        restarted.start().await.unwrap();
        assert!(restarted.is_controlling());
        assert_eq!(restarted.db().entry_count("hypernews-v17").await.unwrap(), 2);

        let home = restarted.fetch(Request::navigation(restarted.resolve("/").unwrap())).await.unwrap();
        assert_eq!(home.status, 200);
        assert_eq!(home.text(), "<main>home</main>");

        let other = restarted.fetch(Request::navigation(restarted.resolve("/about.html").unwrap())).await.unwrap();
        assert_eq!(other.text(), "<main>offline</main>");
        restarted.drain().await;
    }

    #[tokio::test]
    async fn test_start_offline_without_install_stays_inactive() {
        let (worker, _network) = worker().await;
        assert!(matches!(worker.start().await, Err(Error::InstallFailed(_))));
        assert!(!worker.is_controlling());
    }

    #[tokio::test]
    async fn test_activate_with_empty_manifest() {
        let config = hypernews_core::WorkerConfig { static_assets: Vec::new(), ..Default::default() };
        let (worker, _network) = worker_with(config).await;
        assert_eq!(worker.install().await.unwrap().assets, 0);
        assert!(worker.activate().await.unwrap().is_empty());
    }
}
