//! Data models for the batch pipeline.
//!
//! - [`JobConfig`]: validated, immutable run configuration built from [`JobOptions`]
//! - [`Settings`]: persistent defaults loaded from `meshbatch.yaml`
//! - [`RunCounters`], [`EntryState`], [`Stage`], [`BatchSummary`]: per-run state

pub mod job;
pub mod run;
pub mod settings;

pub use job::{JobConfig, JobOptions, ValidationError};
pub use run::{BatchSummary, EntryState, RunCounters, Stage};
pub use settings::{BatchSettings, LogSettings, Settings};
