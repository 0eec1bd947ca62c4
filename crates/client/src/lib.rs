//! Client side of hypernews.
//!
//! This crate provides the network boundary and the tiered HTTP cache that
//! sits in front of it, shared by the server and its tests.

pub mod fetch;
pub mod worker;

pub use fetch::{
    Destination, FetchConfig, HttpNetwork, Network, Request, RequestMode, Response, ResponseSource, ScriptedNetwork,
};

pub use worker::{Interception, PartitionNames, PrefetchReport, ServiceWorker, WorkerMessage};
