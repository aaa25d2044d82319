//! Capability registry for mesh import, export and named filters.
//!
//! The batch pipeline never talks to a codec or a simplification algorithm
//! directly. It asks a [`CapabilityRegistry`] for an [`Importer`] or
//! [`Exporter`] by file extension, or for a [`NamedFilter`] by its display
//! name, and invokes whatever comes back. Lookups return `None` when nothing
//! matches; invocations return a typed [`ProcessingError`].
//!
//! [`PluginRegistry`] is the map-backed implementation. It is constructed
//! explicitly by the caller and handed to the orchestrator by reference, so
//! there is no process-wide plugin state.
//!
//! # Example
//!
//! ```ignore
//! use meshbatch::registry::{CapabilityRegistry, PluginRegistry};
//!
//! let mut registry = PluginRegistry::new();
//! registry.register_importer("obj", Box::new(ObjImporter));
//!
//! assert!(registry.lookup_importer("obj").is_some());
//! assert!(registry.lookup_importer("OBJ").is_none()); // tokens are case-sensitive
//! ```

use crate::engine::MeshDocument;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::TryReserveError;
use thiserror::Error;

/// Errors raised by a capability while it is being invoked
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {details}")]
    Parse { path: Utf8PathBuf, details: String },

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Invalid parameter {name}: {details}")]
    InvalidParameter { name: String, details: String },

    #[error("Processing failed: {0}")]
    Processing(String),
}

impl ProcessingError {
    pub fn io(path: &Utf8Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<TryReserveError> for ProcessingError {
    fn from(err: TryReserveError) -> Self {
        ProcessingError::OutOfMemory(err.to_string())
    }
}

/// A typed parameter value handed to a named filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Bool(_) => "bool",
        }
    }
}

/// Ordered, immutable mapping from parameter name to value.
///
/// Built with the consuming [`with`](Self::with) method; once handed to a
/// filter it is only ever read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: IndexMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a parameter and return the extended set
    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn get_int(&self, name: &str) -> Result<i64, ProcessingError> {
        match self.require(name)? {
            ParamValue::Int(v) => Ok(*v),
            other => Err(Self::type_mismatch(name, "integer", other)),
        }
    }

    /// Float lookup; integer values are widened
    pub fn get_float(&self, name: &str) -> Result<f64, ProcessingError> {
        match self.require(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(Self::type_mismatch(name, "float", other)),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, ProcessingError> {
        match self.require(name)? {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(Self::type_mismatch(name, "bool", other)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&ParamValue, ProcessingError> {
        self.values
            .get(name)
            .ok_or_else(|| ProcessingError::InvalidParameter {
                name: name.to_string(),
                details: "missing".to_string(),
            })
    }

    fn type_mismatch(name: &str, expected: &str, found: &ParamValue) -> ProcessingError {
        ProcessingError::InvalidParameter {
            name: name.to_string(),
            details: format!("expected {}, found {}", expected, found.type_name()),
        }
    }
}

/// Loads a mesh file into a new document
#[cfg_attr(test, mockall::automock)]
pub trait Importer {
    /// Short format name used in log output (e.g. "Wavefront OBJ")
    fn format_name(&self) -> &'static str;

    /// Read the file at `path` into a fresh document
    fn load(&self, path: &Utf8Path) -> Result<MeshDocument, ProcessingError>;
}

/// Writes a document's geometry to a mesh file
#[cfg_attr(test, mockall::automock)]
pub trait Exporter {
    fn format_name(&self) -> &'static str;

    /// Write `document` to `path`. Texture images are saved separately.
    fn save(&self, document: &MeshDocument, path: &Utf8Path) -> Result<(), ProcessingError>;
}

/// A processing operation resolved by its display name
#[cfg_attr(test, mockall::automock)]
pub trait NamedFilter {
    fn name(&self) -> &str;

    /// Run the filter in place on `document`
    fn apply(
        &self,
        document: &mut MeshDocument,
        parameters: &ParameterSet,
    ) -> Result<(), ProcessingError>;
}

/// Lookup interface the batch pipeline depends on.
///
/// Extension tokens are matched exactly as registered: a registry holding
/// only `"3ds"` returns `None` for `"3DS"`.
pub trait CapabilityRegistry {
    fn lookup_importer(&self, extension: &str) -> Option<&dyn Importer>;
    fn lookup_exporter(&self, extension: &str) -> Option<&dyn Exporter>;
    fn lookup_named_filter(&self, name: &str) -> Option<&dyn NamedFilter>;
}

/// Map-backed capability registry
#[derive(Default)]
pub struct PluginRegistry {
    importers: HashMap<String, Box<dyn Importer>>,
    exporters: HashMap<String, Box<dyn Exporter>>,
    filters: HashMap<String, Box<dyn NamedFilter>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an importer for an exact extension token (no leading dot)
    pub fn register_importer(&mut self, extension: &str, importer: Box<dyn Importer>) {
        tracing::debug!(
            "Registered importer {} for .{}",
            importer.format_name(),
            extension
        );
        self.importers.insert(extension.to_string(), importer);
    }

    /// Register an exporter for an exact extension token (no leading dot)
    pub fn register_exporter(&mut self, extension: &str, exporter: Box<dyn Exporter>) {
        tracing::debug!(
            "Registered exporter {} for .{}",
            exporter.format_name(),
            extension
        );
        self.exporters.insert(extension.to_string(), exporter);
    }

    /// Register a filter under the name it reports
    pub fn register_filter(&mut self, filter: Box<dyn NamedFilter>) {
        tracing::debug!("Registered filter \"{}\"", filter.name());
        self.filters.insert(filter.name().to_string(), filter);
    }

    /// Registered import extensions, sorted
    pub fn import_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.importers.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Registered export extensions, sorted
    pub fn export_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.exporters.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    pub fn filter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl CapabilityRegistry for PluginRegistry {
    fn lookup_importer(&self, extension: &str) -> Option<&dyn Importer> {
        self.importers.get(extension).map(|b| b.as_ref())
    }

    fn lookup_exporter(&self, extension: &str) -> Option<&dyn Exporter> {
        self.exporters.get(extension).map(|b| b.as_ref())
    }

    fn lookup_named_filter(&self, name: &str) -> Option<&dyn NamedFilter> {
        self.filters.get(name).map(|b| b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = PluginRegistry::new();
        let mut importer = MockImporter::new();
        importer.expect_format_name().return_const("Mock");
        registry.register_importer("3ds", Box::new(importer));

        assert!(registry.lookup_importer("3ds").is_some());
        assert!(registry.lookup_importer("3DS").is_none());
        assert!(registry.lookup_importer("obj").is_none());
    }

    #[test]
    fn test_missing_capabilities_return_none() {
        let registry = PluginRegistry::new();

        assert!(registry.lookup_importer("obj").is_none());
        assert!(registry.lookup_exporter("obj").is_none());
        assert!(registry.lookup_named_filter("anything").is_none());
    }

    #[test]
    fn test_filter_registered_under_its_name() {
        let mut registry = PluginRegistry::new();
        let mut filter = MockNamedFilter::new();
        filter.expect_name().return_const("Smooth".to_string());
        registry.register_filter(Box::new(filter));

        assert!(registry.lookup_named_filter("Smooth").is_some());
        assert_eq!(registry.filter_names(), vec!["Smooth"]);
    }

    #[test]
    fn test_extension_lists_sorted() {
        let mut registry = PluginRegistry::new();
        for ext in ["stl", "obj", "OBJ"] {
            let mut exporter = MockExporter::new();
            exporter.expect_format_name().return_const("Mock");
            registry.register_exporter(ext, Box::new(exporter));
        }

        assert_eq!(registry.export_extensions(), vec!["OBJ", "obj", "stl"]);
        assert!(registry.import_extensions().is_empty());
    }

    #[test]
    fn test_parameter_set_typed_access() {
        let params = ParameterSet::new()
            .with("TargetFaceNum", ParamValue::Int(500))
            .with("QualityThr", ParamValue::Float(0.3))
            .with("AutoClean", ParamValue::Bool(true));

        assert_eq!(params.len(), 3);
        assert_eq!(params.get_int("TargetFaceNum").unwrap(), 500);
        assert_eq!(params.get_float("QualityThr").unwrap(), 0.3);
        assert_eq!(params.get_float("TargetFaceNum").unwrap(), 500.0);
        assert!(params.get_bool("AutoClean").unwrap());
    }

    #[test]
    fn test_parameter_set_errors() {
        let params = ParameterSet::new().with("AutoClean", ParamValue::Bool(true));

        let missing = params.get_int("TargetFaceNum").unwrap_err();
        assert!(matches!(missing, ProcessingError::InvalidParameter { .. }));

        let mismatch = params.get_float("AutoClean").unwrap_err();
        assert!(mismatch.to_string().contains("expected float, found bool"));
    }

    #[test]
    fn test_parameter_set_preserves_insertion_order() {
        let params = ParameterSet::new()
            .with("b", ParamValue::Int(1))
            .with("a", ParamValue::Int(2))
            .with("c", ParamValue::Int(3));

        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_try_reserve_maps_to_out_of_memory() {
        let mut v: Vec<u64> = Vec::new();
        let err = v.try_reserve(usize::MAX).unwrap_err();
        let processing: ProcessingError = err.into();
        assert!(matches!(processing, ProcessingError::OutOfMemory(_)));
    }
}
