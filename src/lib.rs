// meshbatch - batch 3D mesh simplification
//
// This is the library crate containing the pipeline, the capability registry
// and the built-in mesh engine. The binary crate (main.rs) provides the CLI.

pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod report;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use engine::{MeshDocument, builtin_registry};
pub use models::{BatchSummary, JobConfig, JobOptions, Settings, ValidationError};
pub use registry::{CapabilityRegistry, PluginRegistry};
pub use report::{BatchEvent, Reporter};
pub use services::BatchOrchestrator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
