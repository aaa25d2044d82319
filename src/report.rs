//! Progress and failure reporting.
//!
//! The orchestrator emits a [`BatchEvent`] for the start of a run, for every
//! processed entry, and for the end of the run. Where those events go is up
//! to the caller: [`TracingReporter`] forwards them to the log stream,
//! [`FailureListReporter`] keeps a YAML list of failed entries, and
//! [`ReporterSet`] fans out to several sinks.

use crate::models::{RunCounters, Stage};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fs;
use std::sync::Mutex;

/// Event emitted by the batch orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    RunStarted {
        source_root: Utf8PathBuf,
        destination_root: Utf8PathBuf,
        extension: String,
    },
    EntrySucceeded {
        source: Utf8PathBuf,
        output: Utf8PathBuf,
        counters: RunCounters,
    },
    EntryFailed {
        source: Utf8PathBuf,
        stage: Stage,
        details: String,
        counters: RunCounters,
    },
    RunFinished {
        counters: RunCounters,
    },
}

/// Sink for batch events
#[cfg_attr(test, mockall::automock)]
pub trait Reporter {
    fn report(&self, event: &BatchEvent);
}

/// Forwards events to `tracing` at info (progress) or warn (failures) level
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &BatchEvent) {
        match event {
            BatchEvent::RunStarted {
                source_root,
                destination_root,
                extension,
            } => {
                tracing::info!(
                    source = %source_root,
                    output = %destination_root,
                    "Processing *.{} files from {} into {}",
                    extension,
                    source_root,
                    destination_root
                );
            }
            BatchEvent::EntrySucceeded {
                source,
                output,
                counters,
            } => {
                tracing::info!(
                    failures = counters.failures,
                    successes = counters.successes,
                    source = %source,
                    output = %output,
                    "{} {} -> {}",
                    counters,
                    source,
                    output
                );
            }
            BatchEvent::EntryFailed {
                source,
                stage,
                details,
                counters,
            } => {
                tracing::warn!(
                    failures = counters.failures,
                    successes = counters.successes,
                    source = %source,
                    "{} {}: {} ({})",
                    counters,
                    stage.failure_reason(),
                    source,
                    details
                );
            }
            BatchEvent::RunFinished { counters } => {
                tracing::info!(
                    failures = counters.failures,
                    successes = counters.successes,
                    "Batch finished: {} succeeded, {} failed",
                    counters.successes,
                    counters.failures
                );
            }
        }
    }
}

/// One failed source entry, as written to the failure list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedEntry {
    pub source: Utf8PathBuf,
    pub stage: Stage,
    pub details: String,
}

#[derive(Debug, Serialize)]
struct FailureList<'a> {
    successes: usize,
    failures: usize,
    entries: &'a [FailedEntry],
}

/// Collects failed entries and writes them as YAML when the run finishes
#[derive(Debug)]
pub struct FailureListReporter {
    path: Utf8PathBuf,
    entries: Mutex<Vec<FailedEntry>>,
}

impl FailureListReporter {
    pub fn new<P: AsRef<Utf8Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Failed entries collected so far
    pub fn entries(&self) -> Vec<FailedEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Write the collected entries together with the final counters
    pub fn write(&self, counters: &RunCounters) -> Result<()> {
        let entries = self.entries();
        let list = FailureList {
            successes: counters.successes,
            failures: counters.failures,
            entries: &entries,
        };
        let yaml = serde_yaml_ng::to_string(&list).context("Failed to serialize failure list")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent))?;
        }
        fs::write(&self.path, yaml)
            .with_context(|| format!("Failed to write failure list: {}", self.path))?;

        tracing::info!("Wrote {} failed entries to {}", entries.len(), self.path);
        Ok(())
    }
}

impl Reporter for FailureListReporter {
    fn report(&self, event: &BatchEvent) {
        match event {
            BatchEvent::EntryFailed {
                source,
                stage,
                details,
                ..
            } => {
                if let Ok(mut entries) = self.entries.lock() {
                    entries.push(FailedEntry {
                        source: source.clone(),
                        stage: *stage,
                        details: details.clone(),
                    });
                }
            }
            BatchEvent::RunFinished { counters } => {
                if let Err(e) = self.write(counters) {
                    tracing::error!("{:#}", e);
                }
            }
            _ => {}
        }
    }
}

/// Fans every event out to each registered reporter, in order
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn push(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for ReporterSet {
    fn report(&self, event: &BatchEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}
