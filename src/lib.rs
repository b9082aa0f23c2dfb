//! farewatch library
//!
//! Exposes the fare cache, its store and provider seams, the scheduled scan
//! and the HTTP API so they can be driven from the binary and integration
//! tests.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod provider;
pub mod refresh;
pub mod store;
