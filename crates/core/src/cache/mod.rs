//! SQLite-backed partition store for the tiered HTTP cache.
//!
//! This module provides named cache partitions with async access via
//! tokio-rusqlite. It supports:
//!
//! - Per-partition entries keyed by request identity or a synthetic key
//! - Insertion-order tracking for FIFO trimming
//! - Whole-partition deletion for version garbage collection
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use partitions::StoredResponse;
