//! Out-of-band messages from the page.

use serde::{Deserialize, Serialize};

use hypernews_core::Error;

use super::{ServiceWorker, trim};
use crate::fetch::Request;

/// Messages the worker understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Warm the API partition with article lists. An empty id stands for
    /// the all-categories listing.
    PrefetchCategories {
        #[serde(default)]
        categories: Vec<String>,
    },
}

/// Outcome of a prefetch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchReport {
    pub stored: usize,
    pub failed: usize,
}

impl ServiceWorker {
    /// Accept a message; the work it triggers runs in the background.
    pub fn handle_message(&self, message: WorkerMessage) {
        match message {
            WorkerMessage::PrefetchCategories { categories } => {
                let worker = self.clone();
                self.tasks.spawn("prefetch", async move {
                    worker.prefetch_categories(&categories).await?;
                    Ok(())
                });
            }
        }
    }

    /// Fetch each category's article list plus the category index into the
    /// API partition, then trim the partition to its cap.
    ///
    /// Individual failures are counted and skipped.
    pub async fn prefetch_categories(&self, categories: &[String]) -> Result<PrefetchReport, Error> {
        let partition = self.partitions.api.clone();
        let mut report = PrefetchReport::default();

        let mut targets = Vec::with_capacity(categories.len() + 1);
        for category in categories {
            targets.push(self.articles_url(category)?);
        }
        targets.push(self.resolve(&format!("{}categories", self.config.api_prefix))?);

        for url in targets {
            let request = Request::get(url);
            match self.network.fetch(&request).await {
                Ok(response) => {
                    if self.store(&partition, &request.cache_key(), &response).await {
                        report.stored += 1;
                    } else {
                        tracing::debug!(url = %request.url, status = response.status, "prefetch not stored");
                        report.failed += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "prefetch failed");
                    report.failed += 1;
                }
            }
        }

        trim::trim_partition(&self.db, &partition, self.config.api_max_entries).await;
        tracing::info!(stored = report.stored, failed = report.failed, "prefetched categories");
        Ok(report)
    }

    fn articles_url(&self, category: &str) -> Result<url::Url, Error> {
        let mut url = self.resolve(&format!("{}articles", self.config.api_prefix))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.config.prefetch_limit.to_string());
            if !category.is_empty() {
                query.append_pair("category", category);
            }
        }
        Ok(url)
    }
}
