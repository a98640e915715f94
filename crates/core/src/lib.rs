//! Core types and shared functionality for the vendavoa offline worker.
//!
//! This crate provides:
//! - Versioned response cache with SQLite backend
//! - Route classification (dynamic API traffic vs static assets)
//! - Request model and URL canonicalization
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod routes;

pub use cache::{CacheDb, CacheStore, EntryKey, ResponseSnapshot};
pub use error::Error;
pub use request::WorkerRequest;
pub use routes::RouteClass;
