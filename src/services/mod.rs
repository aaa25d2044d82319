//! Services module - the batch simplification pipeline.
//!
//! Everything here talks to mesh codecs and filters only through a
//! [`CapabilityRegistry`](crate::registry::CapabilityRegistry), so the
//! pipeline runs unchanged against the built-in engine or any other backend.
//!
//! # Components
//!
//! - [`BatchOrchestrator`]: walks the source tree and drives each matching file
//!   through import, simplification and export, keeping the run counters and
//!   emitting [`BatchEvent`](crate::report::BatchEvent)s. A failing file is
//!   counted and skipped; it never stops the run.
//! - [`MeshGateway`]: resolves importers/exporters by file extension. A missing
//!   capability and a failing one are distinct [`ImportError`]/[`ExportError`]
//!   variants.
//! - [`build_simplification_parameters`]: pure builder for the decimation
//!   parameter set of one mesh.
//! - [`Simplifier`]: looks up the decimation filter by name and applies it.
//!
//! # Usage Example
//!
//! ```ignore
//! use meshbatch::engine::builtin_registry;
//! use meshbatch::report::TracingReporter;
//! use meshbatch::services::BatchOrchestrator;
//!
//! let registry = builtin_registry();
//! let reporter = TracingReporter;
//! let summary = BatchOrchestrator::new(&registry, &reporter).run(&job_config)?;
//! println!("{} ok, {} failed", summary.success_count(), summary.failure_count());
//! ```

pub mod batch;
pub mod gateway;
pub mod params;
pub mod simplify;

pub use batch::{BatchOrchestrator, StageFailure, prepare_destination};
pub use gateway::{ExportError, ImportError, MeshGateway};
pub use params::build_simplification_parameters;
pub use simplify::{QUADRIC_EDGE_COLLAPSE_FILTER, SimplifyError, Simplifier};
