// src/utils/mod.rs
//! Common utilities shared by the recording and replay layers
//!
//! - **config**: Layered configuration (defaults, file, environment)
//! - **errors**: Crate-wide error type
//! - **time**: Wall-clock helpers

pub mod config;
pub mod errors;
pub mod time;

pub use config::{AppConfig, ArchiverConfig, ObservabilityConfig, ReplayConfig, SinkConfig};
pub use errors::{ArchiveError, Result};
