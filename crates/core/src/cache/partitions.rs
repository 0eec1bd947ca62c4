//! Partition and entry operations.
//!
//! A partition is a named store of responses (static shell, API, image,
//! TTS). Entries remember the order they were put in, which is the only
//! ordering trimming relies on.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response payload as kept in a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Build a payload stamped with the current time.
    pub fn new(status: u16, content_type: Option<String>, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { status, content_type, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }
}

/// Row decoding failures that mean "this entry is unusable", not "the store is broken".
fn is_corrupt_row(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
    )
}

impl CacheDb {
    /// Create a partition if it doesn't exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every existing partition, oldest first.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if the partition didn't exist.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under `key`, creating the partition on demand.
    ///
    /// Overwriting an existing key makes it the newest entry of the partition.
    pub async fn put_entry(&self, partition: &str, key: &str, response: &StoredResponse) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, response.stored_at],
                )?;
                tx.execute("DELETE FROM entries WHERE partition = ?1 AND key = ?2", params![partition, key])?;
                tx.execute(
                    "INSERT INTO entries (partition, key, status, content_type, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        partition,
                        key,
                        response.status,
                        response.content_type,
                        headers_json,
                        response.body,
                        response.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored under `key`.
    ///
    /// Returns None if the entry is absent or cannot be decoded.
    pub async fn match_entry(&self, partition: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        let lookup_key = key.clone();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(StoredResponse, Option<String>)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, content_type, headers_json, body, stored_at
                     FROM entries WHERE partition = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, lookup_key], |row| {
                    Ok((
                        StoredResponse {
                            status: row.get(0)?,
                            content_type: row.get(1)?,
                            headers: Vec::new(),
                            body: row.get(3)?,
                            stored_at: row.get(4)?,
                        },
                        row.get::<_, Option<String>>(2)?,
                    ))
                });

                match result {
                    Ok(found) => Ok(Some(found)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) if is_corrupt_row(&e) => {
                        tracing::warn!(error = %e, "undecodable cache entry, treating as miss");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((mut response, headers_json)) = row else {
            return Ok(None);
        };

        if let Some(json) = headers_json {
            match serde_json::from_str(&json) {
                Ok(headers) => response.headers = headers,
                Err(e) => {
                    tracing::warn!(%key, error = %e, "corrupt header record, treating as miss");
                    return Ok(None);
                }
            }
        }

        Ok(Some(response))
    }

    /// Entry keys of a partition in insertion order (oldest first).
    pub async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE partition = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries held by a partition.
    pub async fn entry_count(&self, partition: &str) -> Result<usize, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete oldest-inserted entries until the partition holds at most `max_entries`.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_partition(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE seq IN (
                        SELECT seq FROM entries WHERE partition = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![partition, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
