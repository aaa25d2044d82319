//! meshbatch - batch 3D mesh simplification
//!
//! Main entry point for the command-line application.
//!
//! # Execution Flow
//!
//! 1. Parse flags and load `meshbatch.yaml` from `--config-dir`
//! 2. Initialize logging (log file or daily log + optional console)
//! 3. Validate the merged options into a [`JobConfig`]; invalid input exits non-zero
//! 4. Build the built-in capability registry and the reporter sinks
//! 5. Run the batch; per-file failures are logged and counted, never fatal
//! 6. Log the metrics summary

use anyhow::{Context, Result};
use clap::Parser;
use meshbatch::cli::Cli;
use meshbatch::report::{FailureListReporter, ReporterSet, TracingReporter};
use meshbatch::{APP_NAME, BatchOrchestrator, ConfigManager, JobConfig, VERSION, builtin_registry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let settings = config_manager.load_settings()?;

    // Held until the end of main so buffered log lines are flushed
    let _guard = meshbatch::logging::setup_logging_with_console(
        &cli.log_destination(&settings),
        cli.debug_mode(&settings),
        cli.console_output(&settings),
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let job = match JobConfig::try_from(cli.job_options(&settings)) {
        Ok(job) => job,
        Err(e) => {
            tracing::error!("Invalid arguments: {}", e);
            return Err(e).context("Invalid arguments");
        }
    };

    let registry = builtin_registry();
    tracing::debug!(
        "Import formats: {:?}, export formats: {:?}, filters: {:?}",
        registry.import_extensions(),
        registry.export_extensions(),
        registry.filter_names()
    );

    let mut reporters = ReporterSet::new().with(Box::new(TracingReporter));
    if let Some(path) = &cli.failure_list {
        reporters.push(Box::new(FailureListReporter::new(path)));
    }

    let orchestrator = BatchOrchestrator::new(&registry, &reporters);
    let summary = orchestrator.run(&job)?;
    orchestrator.metrics().log_summary();

    tracing::info!(
        "Done: {} succeeded, {} failed, output in {}",
        summary.success_count(),
        summary.failure_count(),
        summary.destination_root
    );

    Ok(())
}
