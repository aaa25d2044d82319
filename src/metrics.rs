// Batch metrics module
//
// Lightweight counters for traversal, mesh reduction and per-stage timing

use crate::models::Stage;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Metrics collected over one batch run
///
/// Uses atomic operations so a shared reference is enough to record from
/// anywhere in the pipeline. Logged once at the end of the run.
#[derive(Debug)]
pub struct BatchMetrics {
    /// Files seen during traversal, before the extension filter
    pub files_discovered: AtomicUsize,

    /// Files skipped by the extension filter
    pub files_filtered_out: AtomicUsize,

    /// Directory entries that could not be read
    pub unreadable_entries: AtomicUsize,

    /// Faces of every imported mesh before simplification
    pub faces_before: AtomicU64,

    /// Faces of every simplified mesh
    pub faces_after: AtomicU64,

    pub import_time_ms: AtomicU64,
    pub simplify_time_ms: AtomicU64,
    pub export_time_ms: AtomicU64,

    start_time: Instant,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self {
            files_discovered: AtomicUsize::new(0),
            files_filtered_out: AtomicUsize::new(0),
            unreadable_entries: AtomicUsize::new(0),
            faces_before: AtomicU64::new(0),
            faces_after: AtomicU64::new(0),
            import_time_ms: AtomicU64::new(0),
            simplify_time_ms: AtomicU64::new(0),
            export_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_file_discovered(&self) {
        self.files_discovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_filtered_out(&self) {
        self.files_filtered_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unreadable_entry(&self) {
        self.unreadable_entries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record face counts around one successful simplification
    pub fn record_reduction(&self, before: usize, after: usize) {
        self.faces_before.fetch_add(before as u64, Ordering::Relaxed);
        self.faces_after.fetch_add(after as u64, Ordering::Relaxed);
    }

    /// Record time spent in a stage, whether it succeeded or not
    pub fn record_stage_time(&self, stage: Stage, duration: Duration) {
        let counter = match stage {
            Stage::Import => &self.import_time_ms,
            Stage::Simplify => &self.simplify_time_ms,
            Stage::Export => &self.export_time_ms,
        };
        counter.fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of faces kept across all simplified meshes (1.0 when nothing was simplified)
    pub fn face_reduction_ratio(&self) -> f64 {
        let before = self.faces_before.load(Ordering::Relaxed);
        let after = self.faces_after.load(Ordering::Relaxed);
        if before > 0 {
            after as f64 / before as f64
        } else {
            1.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Batch Metrics Summary ===");
        tracing::info!("Elapsed: {:.2}s", self.elapsed().as_secs_f64());
        tracing::info!(
            "Files: {} discovered, {} filtered out, {} unreadable entries",
            self.files_discovered.load(Ordering::Relaxed),
            self.files_filtered_out.load(Ordering::Relaxed),
            self.unreadable_entries.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Faces: {} -> {} ({:.1}% kept)",
            self.faces_before.load(Ordering::Relaxed),
            self.faces_after.load(Ordering::Relaxed),
            self.face_reduction_ratio() * 100.0
        );
        tracing::info!(
            "Stage time: import {:.2}s, simplify {:.2}s, export {:.2}s",
            self.import_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.simplify_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.export_time_ms.load(Ordering::Relaxed) as f64 / 1000.0
        );
    }
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
