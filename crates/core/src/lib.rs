//! Core types and shared functionality for hypernews.
//!
//! This crate provides:
//! - The client-side token ledger and AI answer memo
//! - The SQLite-backed partition store behind the tiered HTTP cache
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod ledger;

pub use cache::{CacheDb, StoredResponse};
pub use config::{AppConfig, ConfigError, LedgerConfig, WorkerConfig};
pub use error::Error;
pub use ledger::Ledger;
