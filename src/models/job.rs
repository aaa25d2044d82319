use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;
use thiserror::Error;

/// Startup validation failures; any of these aborts the run before processing
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Input directory does not exist: {0}")]
    SourceNotFound(Utf8PathBuf),

    #[error("Input path is not a directory: {0}")]
    SourceNotDirectory(Utf8PathBuf),

    #[error("Failed to resolve path {path}")]
    Unresolvable {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output directory {destination} overlaps input directory {source_root}")]
    DestinationOverlapsSource {
        source_root: Utf8PathBuf,
        destination: Utf8PathBuf,
    },

    #[error("{path} is inside output directory {destination}, which is cleared on every run")]
    InsideDestination {
        path: Utf8PathBuf,
        destination: Utf8PathBuf,
    },

    #[error("{0} must not be empty")]
    EmptyExtension(&'static str),

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

/// Unvalidated job values, as merged from settings and command-line flags
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub source_root: Utf8PathBuf,
    pub destination_root: Utf8PathBuf,
    pub extension: String,
    pub output_format: String,
    pub texture_quality: u32,
    pub mesh_quality_percent: u32,
    pub face_ratio_percent: u32,
    /// Files or directories the run writes besides the mesh tree (logs,
    /// failure list); none may live under the destination root
    pub side_outputs: Vec<Utf8PathBuf>,
}

/// Validated, immutable configuration for one batch run
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    source_root: Utf8PathBuf,
    destination_root: Utf8PathBuf,
    extension_filter: String,
    output_extension: String,
    texture_quality: u8,
    quality_threshold: f64,
    target_face_ratio: f64,
}

impl TryFrom<JobOptions> for JobConfig {
    type Error = ValidationError;

    fn try_from(options: JobOptions) -> Result<Self, Self::Error> {
        if !options.source_root.exists() {
            return Err(ValidationError::SourceNotFound(options.source_root));
        }
        if !options.source_root.is_dir() {
            return Err(ValidationError::SourceNotDirectory(options.source_root));
        }

        let extension_filter = normalize_extension(&options.extension)
            .ok_or(ValidationError::EmptyExtension("Source extension"))?
            .to_ascii_lowercase();
        let output_extension = normalize_extension(&options.output_format)
            .ok_or(ValidationError::EmptyExtension("Output format"))?
            .to_string();

        check_range("Texture quality", options.texture_quality, 0, 100)?;
        check_range("Mesh quality", options.mesh_quality_percent, 1, 100)?;
        check_range("Face ratio", options.face_ratio_percent, 1, 100)?;

        let source_root = resolve(&options.source_root)?;
        let destination_root = resolve(&options.destination_root)?;
        if destination_root.starts_with(&source_root) || source_root.starts_with(&destination_root) {
            return Err(ValidationError::DestinationOverlapsSource {
                source_root,
                destination: destination_root,
            });
        }
        for path in &options.side_outputs {
            let resolved = resolve(path)?;
            if resolved.starts_with(&destination_root) {
                return Err(ValidationError::InsideDestination {
                    path: resolved,
                    destination: destination_root,
                });
            }
        }

        Ok(Self {
            source_root,
            destination_root,
            extension_filter,
            output_extension,
            texture_quality: options.texture_quality as u8,
            quality_threshold: f64::from(options.mesh_quality_percent) / 100.0,
            target_face_ratio: f64::from(options.face_ratio_percent) / 100.0,
        })
    }
}

impl JobConfig {
    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Utf8Path {
        &self.destination_root
    }

    /// Lower-case extension filter without the leading dot
    pub fn extension_filter(&self) -> &str {
        &self.extension_filter
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    pub fn texture_quality(&self) -> u8 {
        self.texture_quality
    }

    /// Quality threshold in [0, 1]
    pub fn quality_threshold(&self) -> f64 {
        self.quality_threshold
    }

    /// Target face ratio in [0, 1]
    pub fn target_face_ratio(&self) -> f64 {
        self.target_face_ratio
    }

    /// Case-insensitive match of the path's extension against the filter
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension_filter))
    }

    /// Mirror a path relative to the source root into the destination root,
    /// with the extension replaced by the output format
    pub fn output_path_for(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.destination_root
            .join(relative)
            .with_extension(&self.output_extension)
    }
}

fn normalize_extension(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('.').unwrap_or(trimmed);
    (!stripped.is_empty()).then_some(stripped)
}

fn check_range(name: &'static str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// Canonicalize the deepest existing ancestor of `path` and append the rest
fn resolve(path: &Utf8Path) -> Result<Utf8PathBuf, ValidationError> {
    let unresolvable = |source: std::io::Error| ValidationError::Unresolvable {
        path: path.to_path_buf(),
        source,
    };

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(unresolvable)?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|e| unresolvable(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        cwd.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing.canonicalize_utf8().map_err(unresolvable)?;
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
