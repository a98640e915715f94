//! SQLite-backed versioned cache store.
//!
//! This module provides the durable response cache using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - One namespace per cache version tag, all in one database
//! - Whole-snapshot entries keyed by SHA-256 of method + URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Version enumeration and wholesale eviction for activation

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheStore, ResponseSnapshot};
pub use key::EntryKey;
