//! Detached background work (revalidation fetches, prefetching).
//!
//! Spawned work is fire-and-forget for the caller that triggered it.
//! Failures are logged and swallowed here, never surfaced to a page.

use std::future::Future;
use std::sync::Mutex;

use tokio::task::JoinSet;

use hypernews_core::Error;

/// Set of detached tasks owned by the worker.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` in the background; `label` names it in the logs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while let Some(finished) = set.try_join_next() {
            if let Err(e) = finished {
                tracing::warn!(error = %e, "background task panicked");
            }
        }
        set.spawn(async move {
            if let Err(e) = work.await {
                tracing::debug!(task = label, error = %e, "background task failed");
            }
        });
    }

    /// Tasks spawned and not yet reaped.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    /// Wait for every outstanding task, including tasks spawned meanwhile.
    pub async fn drain(&self) {
        loop {
            let mut set = std::mem::take(&mut *self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
            if set.is_empty() {
                return;
            }
            while let Some(finished) = set.join_next().await {
                if let Err(e) = finished {
                    tracing::warn!(error = %e, "background task panicked");
                }
            }
        }
    }
}
