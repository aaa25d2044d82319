use super::gateway::{ExportError, ImportError, MeshGateway};
use super::params::build_simplification_parameters;
use super::simplify::{SimplifyError, Simplifier};
use crate::metrics::BatchMetrics;
use crate::models::{BatchSummary, EntryState, JobConfig, RunCounters, Stage};
use crate::registry::CapabilityRegistry;
use crate::report::{BatchEvent, Reporter};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

/// Why a single source entry was abandoned
#[derive(Error, Debug)]
pub enum StageFailure {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Simplify(#[from] SimplifyError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

impl StageFailure {
    pub fn stage(&self) -> Stage {
        match self {
            StageFailure::Import(_) | StageFailure::NonUtf8Path(_) => Stage::Import,
            StageFailure::Simplify(_) => Stage::Simplify,
            StageFailure::Export(_) => Stage::Export,
        }
    }

    /// The error and all of its sources, joined with ": "
    pub fn details(&self) -> String {
        let mut details = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            details.push_str(": ");
            details.push_str(&err.to_string());
            source = err.source();
        }
        details
    }
}

/// Drives every matching source file through import, simplify and export.
///
/// Files are processed one at a time; a failure in any stage abandons that
/// file, is counted once, and processing moves on to the next file.
pub struct BatchOrchestrator<'a> {
    registry: &'a dyn CapabilityRegistry,
    reporter: &'a dyn Reporter,
    metrics: BatchMetrics,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(registry: &'a dyn CapabilityRegistry, reporter: &'a dyn Reporter) -> Self {
        Self {
            registry,
            reporter,
            metrics: BatchMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &BatchMetrics {
        &self.metrics
    }

    /// Run the batch described by `config`.
    ///
    /// Per-file failures never make this return `Err`; only failing to
    /// prepare the destination tree does.
    pub fn run(&self, config: &JobConfig) -> Result<BatchSummary> {
        prepare_destination(config.destination_root())?;

        self.reporter.report(&BatchEvent::RunStarted {
            source_root: config.source_root().to_path_buf(),
            destination_root: config.destination_root().to_path_buf(),
            extension: config.extension_filter().to_string(),
        });

        let mut counters = RunCounters::default();
        let mut unreadable_entries = 0;

        let walker = WalkDir::new(config.source_root())
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    self.metrics.record_unreadable_entry();
                    unreadable_entries += 1;
                    continue;
                }
            };

            // Links to directories are not followed; dangling links go on to
            // fail at import like any other missing file
            let file_type = entry.file_type();
            if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
                continue;
            }

            self.metrics.record_file_discovered();
            if !config.matches_extension(entry.path()) {
                self.metrics.record_file_filtered_out();
                tracing::debug!("Skipping {} (extension filter)", entry.path().display());
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(config.source_root()) else {
                tracing::warn!("Skipping {}: not under the input directory", entry.path().display());
                self.metrics.record_unreadable_entry();
                unreadable_entries += 1;
                continue;
            };

            match self.process_entry(config, relative) {
                Ok((source, output)) => {
                    counters.record_success();
                    self.reporter.report(&BatchEvent::EntrySucceeded {
                        source,
                        output,
                        counters,
                    });
                }
                Err(failure) => {
                    counters.record_failure();
                    self.reporter.report(&BatchEvent::EntryFailed {
                        source: lossy_utf8(entry.path()),
                        stage: failure.stage(),
                        details: failure.details(),
                        counters,
                    });
                }
            }
        }

        self.reporter.report(&BatchEvent::RunFinished { counters });

        Ok(BatchSummary {
            counters,
            destination_root: config.destination_root().to_path_buf(),
            unreadable_entries,
        })
    }

    /// Import, simplify and export one file, given by its path relative to
    /// the source root; returns its source and output paths
    pub fn process_entry(
        &self,
        config: &JobConfig,
        relative: &Path,
    ) -> Result<(Utf8PathBuf, Utf8PathBuf), StageFailure> {
        let relative = Utf8Path::from_path(relative).ok_or_else(|| {
            StageFailure::NonUtf8Path(config.source_root().as_std_path().join(relative))
        })?;
        let source = config.source_root().join(relative);

        let gateway = MeshGateway::new(self.registry);
        let simplifier = Simplifier::new(self.registry);
        let mut state = EntryState::Discovered;

        let mut document = self.run_stage(&mut state, || gateway.import(&source))?;

        let stats = document.stats();
        let parameters = build_simplification_parameters(
            &stats,
            config.target_face_ratio(),
            config.quality_threshold(),
        );
        tracing::debug!(
            "{}: {} faces ({} selected), target {:?}",
            source,
            stats.face_count,
            stats.selected_face_count,
            parameters.get("TargetFaceNum")
        );
        self.run_stage(&mut state, || simplifier.simplify(&mut document, &parameters))?;
        self.metrics
            .record_reduction(stats.face_count, document.face_count());

        let output = config.output_path_for(relative);
        self.run_stage(&mut state, || {
            gateway.export(document, &output, config.texture_quality())
        })?;

        debug_assert_eq!(state, EntryState::Exported);
        Ok((source, output))
    }

    /// Run the stage pending in `state`, timing it and moving `state` forward
    fn run_stage<T, E>(
        &self,
        state: &mut EntryState,
        stage: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, StageFailure>
    where
        StageFailure: From<E>,
    {
        let started = Instant::now();
        let result = stage();
        if let Some(pending) = state.pending_stage() {
            self.metrics.record_stage_time(pending, started.elapsed());
        }

        match result {
            Ok(value) => {
                *state = state.advance();
                Ok(value)
            }
            Err(e) => {
                *state = state.fail();
                tracing::debug!("Entry moved to {:?}", state);
                Err(e.into())
            }
        }
    }
}

/// Remove any previous destination tree and create it empty
pub fn prepare_destination(destination: &Utf8Path) -> Result<()> {
    if destination.exists() {
        fs::remove_dir_all(destination)
            .with_context(|| format!("Failed to remove output directory: {}", destination))?;
        tracing::debug!("Removed previous output directory {}", destination);
    }
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create output directory: {}", destination))?;
    Ok(())
}

fn lossy_utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.to_string_lossy().into_owned())
}
