//! The vendavoa offline worker: lifecycle controller and HTTP gateway.
//!
//! This crate ties the core cache store and the client strategies together
//! into the worker that fronts the dealership app, and exposes it over HTTP.

pub mod gateway;
pub mod worker;

pub use worker::{ControlMessage, ServiceWorker, SyncHandler, WorkerState};
