// src/replay/mod.rs
//! Deterministic replay and offline analysis of export documents
//!
//! - **Engine**: Re-dispatches events with their original relative timing
//! - **Analysis**: Per-method distribution and time span
//!
//! Replay only ever reads detached [`ExportDocument`]s; it never touches a
//! live archive.
//!
//! [`ExportDocument`]: crate::recording::document::ExportDocument

pub mod analysis;
pub mod engine;

pub use analysis::{analyze, AnalysisReport, MethodCount};
pub use engine::{replay, ReplayOptions, ReplaySummary, Replayer};
