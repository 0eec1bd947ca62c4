//! Shared FIFO trimmer for cache partitions.

use hypernews_core::CacheDb;

/// Bound `partition` to `max_entries`, deleting oldest insertions first.
///
/// Best-effort: storage errors are logged and reported as nothing trimmed.
pub async fn trim_partition(db: &CacheDb, partition: &str, max_entries: usize) -> u64 {
    match db.trim_partition(partition, max_entries).await {
        Ok(0) => 0,
        Ok(deleted) => {
            tracing::debug!(partition, deleted, max_entries, "trimmed partition");
            deleted
        }
        Err(e) => {
            tracing::warn!(partition, error = %e, "partition trim failed");
            0
        }
    }
}
