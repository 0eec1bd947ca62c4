//! Per-resource-class caching strategies.
//!
//! None of these return an error: a network failure resolves to a cached
//! entry, the offline page, or a synthetic error response.

use hypernews_core::cache::hash::request_key;

use super::{ServiceWorker, trim};
use crate::fetch::{Request, Response};

const OFFLINE_JSON: &str = r#"{"error":"offline"}"#;

impl ServiceWorker {
    /// API traffic: serve the cached entry at once and refresh it in the
    /// background; on a miss, wait for the network.
    pub(crate) async fn stale_while_revalidate(&self, request: Request) -> Response {
        let partition = self.partitions.api.clone();
        let key = request.cache_key();

        if let Some(cached) = self.lookup(&partition, &key).await {
            let worker = self.clone();
            self.tasks.spawn("revalidate", async move {
                let response = worker.network.fetch(&request).await?;
                if worker.store(&partition, &key, &response).await {
                    trim::trim_partition(&worker.db, &partition, worker.config.api_max_entries).await;
                }
                Ok(())
            });
            return cached;
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if self.store(&partition, &key, &response).await {
                    trim::trim_partition(&self.db, &partition, self.config.api_max_entries).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "api fetch failed with nothing cached");
                Response::synthetic(503, "application/json", OFFLINE_JSON)
            }
        }
    }

    /// Images: cached copy if any, else the network, else a synthetic 404.
    pub(crate) async fn cache_first(&self, request: Request) -> Response {
        let partition = &self.partitions.image;
        let key = request.cache_key();

        if let Some(cached) = self.lookup(partition, &key).await {
            return cached;
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store(partition, &key, &response).await;
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "image fetch failed");
                Response::synthetic(404, "text/plain", "")
            }
        }
    }

    /// Application shell: cached copy with a background refresh; on a miss
    /// the network, then the offline page for navigations, then a 503.
    pub(crate) async fn cache_first_with_update(&self, request: Request) -> Response {
        let partition = self.partitions.static_assets.clone();
        let key = request.cache_key();

        if let Some(cached) = self.lookup(&partition, &key).await {
            let worker = self.clone();
            self.tasks.spawn("static-update", async move {
                let response = worker.network.fetch(&request).await?;
                worker.store(&partition, &key, &response).await;
                Ok(())
            });
            return cached;
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store(&partition, &key, &response).await;
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "shell fetch failed");
                if request.is_navigation()
                    && let Some(offline) = self.offline_page().await
                {
                    return offline;
                }
                Response::synthetic(503, "text/plain", "Offline")
            }
        }
    }

    async fn offline_page(&self) -> Option<Response> {
        let url = self.resolve(&self.config.offline_page).ok()?;
        self.lookup(&self.partitions.static_assets, &request_key("GET", url.as_str())).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::fetch::{Destination, ResponseSource};
    use crate::worker::Interception;

    use super::*;

    async fn respond(worker: &ServiceWorker, request: Request) -> Response {
        match worker.handle_fetch(request).await {
            Interception::Respond(response) => response,
            Interception::Passthrough(request) => panic!("{} was not intercepted", request.url),
        }
    }

    #[tokio::test]
    async fn test_api_miss_waits_for_network_and_stores() {
        let (worker, network) = active_worker().await;
        network.respond(&url("/api/articles?limit=30"), 200, "application/json", "[1]");

        let response = respond(&worker, Request::get(worker.resolve("/api/articles?limit=30").unwrap())).await;
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.text(), "[1]");

        let keys = worker.db().entry_keys(&worker.partitions().api).await.unwrap();
        assert_eq!(keys, vec![format!("GET {}", url("/api/articles?limit=30"))]);
    }

    #[tokio::test]
    async fn test_api_serves_stale_when_network_fails() {
        let (worker, network) = active_worker().await;
        network.respond(&url("/api/articles"), 200, "application/json", "[\"old\"]");
        let request = Request::get(worker.resolve("/api/articles").unwrap());
        respond(&worker, request.clone()).await;

        network.go_offline();
        let response = respond(&worker, request).await;
        worker.drain().await;

        assert_eq!(response.status, 200);
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.text(), "[\"old\"]");
    }

    #[tokio::test]
    async fn test_api_background_revalidation_overwrites_entry() {
        let (worker, network) = active_worker().await;
        let request = Request::get(worker.resolve("/api/articles").unwrap());
        network.respond(&url("/api/articles"), 200, "application/json", "[1]");
        respond(&worker, request.clone()).await;

        network.respond(&url("/api/articles"), 200, "application/json", "[2]");
        let stale = respond(&worker, request.clone()).await;
        assert_eq!(stale.text(), "[1]");

        worker.drain().await;
        let fresh = respond(&worker, request).await;
        assert_eq!(fresh.text(), "[2]");
        worker.drain().await;
    }

    #[tokio::test]
    async fn test_api_error_status_is_returned_but_not_stored() {
        let (worker, network) = active_worker().await;
        network.respond(&url("/api/articles"), 500, "application/json", "{}");

        let response = respond(&worker, Request::get(worker.resolve("/api/articles").unwrap())).await;
        assert_eq!(response.status, 500);
        assert_eq!(worker.db().entry_count(&worker.partitions().api).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_api_miss_offline_is_synthetic_503() {
        let (worker, _network) = active_worker().await;
        let response = respond(&worker, Request::get(worker.resolve("/api/categories").unwrap())).await;
        assert_eq!(response.status, 503);
        assert_eq!(response.source, ResponseSource::Synthetic);
    }

    #[tokio::test]
    async fn test_api_partition_stays_at_cap() {
        let config = hypernews_core::WorkerConfig { api_max_entries: 3, static_assets: Vec::new(), ..Default::default() };
        let (worker, network) = worker_with(config).await;
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        for page in 0..5 {
            let path = format!("/api/articles?page={page}");
            network.respond(&url(&path), 200, "application/json", "[]");
            respond(&worker, Request::get(worker.resolve(&path).unwrap())).await;
        }

        let keys = worker.db().entry_keys(&worker.partitions().api).await.unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], format!("GET {}", url("/api/articles?page=2")));
    }

    #[tokio::test]
    async fn test_image_cache_first() {
        let (worker, network) = active_worker().await;
        network.respond(&url("/img/a.png"), 200, "image/png", vec![1u8, 2, 3]);
        let request = Request::get(worker.resolve("/img/a.png").unwrap());

        assert_eq!(respond(&worker, request.clone()).await.source, ResponseSource::Network);
        let cached = respond(&worker, request).await;
        assert_eq!(cached.source, ResponseSource::Cache);
        assert_eq!(cached.body.as_ref(), &[1, 2, 3]);
        assert_eq!(network.call_count(&url("/img/a.png")), 1);
    }

    #[tokio::test]
    async fn test_image_failure_is_synthetic_404() {
        let (worker, _network) = active_worker().await;
        let request = Request::get(worker.resolve("/thumb?id=1").unwrap()).with_destination(Destination::Image);
        let response = respond(&worker, request).await;
        assert_eq!(response.status, 404);
        assert_eq!(response.source, ResponseSource::Synthetic);
    }

    #[tokio::test]
    async fn test_static_served_from_cache_with_background_update() {
        let (worker, network) = active_worker().await;
        network.respond(&url("/"), 200, "text/html", "<main>v2</main>");

        let response = respond(&worker, Request::navigation(worker.resolve("/").unwrap())).await;
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.text(), "<main>home</main>");

        worker.drain().await;
        let updated = respond(&worker, Request::navigation(worker.resolve("/").unwrap())).await;
        assert_eq!(updated.text(), "<main>v2</main>");
        worker.drain().await;
    }

    #[tokio::test]
    async fn test_static_miss_offline_navigation_gets_offline_page() {
        let (worker, network) = active_worker().await;
        network.go_offline();

        let response = respond(&worker, Request::navigation(worker.resolve("/settings.html").unwrap())).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), "<main>offline</main>");
    }

    #[tokio::test]
    async fn test_static_miss_offline_subresource_gets_503() {
        let (worker, network) = active_worker().await;
        network.go_offline();

        let response = respond(&worker, Request::get(worker.resolve("/js/app.js?v=16").unwrap())).await;
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "Offline");
    }
}
