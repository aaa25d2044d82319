//! Command-line surface of the `meshbatch` binary.
//!
//! Flags left unset fall back to `meshbatch.yaml` (see [`Settings`]).

use crate::logging::LogDestination;
use crate::models::{JobOptions, Settings};
use camino::Utf8PathBuf;
use clap::Parser;

/// meshbatch - batch mesh simplification.
///
/// Walks the input directory, simplifies every mesh with the configured
/// extension and writes the results into a mirrored output directory.
#[derive(Parser, Debug)]
#[command(name = "meshbatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input root directory
    #[arg(short, long)]
    pub input: Utf8PathBuf,

    /// Output root directory (removed and recreated on every run)
    #[arg(short, long)]
    pub output: Utf8PathBuf,

    /// Log file path (defaults to a daily log in the configured log directory)
    #[arg(short, long)]
    pub log_file: Option<Utf8PathBuf>,

    /// Source file extension to process, with or without the leading dot
    #[arg(short, long)]
    pub extension: Option<String>,

    /// Texture export quality (0-100)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub texture_quality: Option<u32>,

    /// Mesh quality threshold in percent (1-100)
    #[arg(short = 'q', long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub mesh_quality: Option<u32>,

    /// Target face count in percent of the current count (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub face_ratio: Option<u32>,

    /// Output mesh format extension
    #[arg(long)]
    pub output_format: Option<String>,

    /// Directory containing meshbatch.yaml
    #[arg(long, default_value = ".")]
    pub config_dir: Utf8PathBuf,

    /// Write a YAML list of failed files to this path
    #[arg(long)]
    pub failure_list: Option<Utf8PathBuf>,

    /// Disable console log output
    #[arg(long)]
    pub no_console: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Merge flags over settings into unvalidated job options
    pub fn job_options(&self, settings: &Settings) -> JobOptions {
        let batch = &settings.batch;
        JobOptions {
            source_root: self.input.clone(),
            destination_root: self.output.clone(),
            extension: self
                .extension
                .clone()
                .unwrap_or_else(|| batch.source_extension.clone()),
            output_format: self
                .output_format
                .clone()
                .unwrap_or_else(|| batch.output_format.clone()),
            texture_quality: self
                .texture_quality
                .unwrap_or(u32::from(batch.texture_quality)),
            mesh_quality_percent: self.mesh_quality.unwrap_or(u32::from(batch.mesh_quality)),
            face_ratio_percent: self.face_ratio.unwrap_or(u32::from(batch.face_ratio)),
            side_outputs: self
                .failure_list
                .iter()
                .cloned()
                .chain([self.log_destination(settings).path().to_path_buf()])
                .collect(),
        }
    }

    pub fn log_destination(&self, settings: &Settings) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::File(path.clone()),
            None => LogDestination::Daily {
                dir: Utf8PathBuf::from(&settings.log.log_directory),
                prefix: "meshbatch".to_string(),
            },
        }
    }

    pub fn console_output(&self, settings: &Settings) -> bool {
        !self.no_console && settings.log.console_output
    }

    pub fn debug_mode(&self, settings: &Settings) -> bool {
        self.debug || settings.log.debug_mode
    }
}
