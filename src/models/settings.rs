use serde::{Deserialize, Serialize};

/// Persistent settings from meshbatch.yaml
///
/// Every field is optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "Batch_Settings", default)]
    pub batch: BatchSettings,

    #[serde(rename = "Log_Settings", default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    #[serde(rename = "Source Extension", default = "default_source_extension")]
    pub source_extension: String,

    #[serde(rename = "Output Format", default = "default_output_format")]
    pub output_format: String,

    #[serde(rename = "Texture Quality", default = "default_texture_quality")]
    pub texture_quality: u8,

    /// Quality threshold as a percentage (1-100)
    #[serde(rename = "Mesh Quality", default = "default_mesh_quality")]
    pub mesh_quality: u8,

    /// Target face count as a percentage of the current count (1-100)
    #[serde(rename = "Face Ratio", default = "default_face_ratio")]
    pub face_ratio: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(rename = "Log Directory", default = "default_log_directory")]
    pub log_directory: String,

    #[serde(rename = "Console Output", default = "default_true")]
    pub console_output: bool,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
            output_format: default_output_format(),
            texture_quality: default_texture_quality(),
            mesh_quality: default_mesh_quality(),
            face_ratio: default_face_ratio(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            log_directory: default_log_directory(),
            console_output: true,
            debug_mode: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            batch: BatchSettings::default(),
            log: LogSettings::default(),
        }
    }
}

fn default_source_extension() -> String {
    "obj".to_string()
}

fn default_output_format() -> String {
    "obj".to_string()
}

fn default_texture_quality() -> u8 {
    50
}

fn default_mesh_quality() -> u8 {
    30
}

fn default_face_ratio() -> u8 {
    50
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_true() -> bool {
    true
}
