//! Client code for the vendavoa offline worker.
//!
//! This crate provides the outgoing network pipeline, the two caching
//! strategies, and offline fallback synthesis used by the worker.

pub mod fallback;
pub mod fetch;
pub mod strategy;

pub use fallback::{api_fallback, document_fallback};
pub use fetch::{NetClient, NetConfig, Network};
pub use strategy::{cache_first, execute, network_first};
