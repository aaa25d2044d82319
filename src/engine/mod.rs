//! Built-in mesh engine.
//!
//! Provides the in-memory [`MeshDocument`], OBJ and STL codecs, and a quadric
//! edge collapse decimator, all exposed through the capability traits in
//! [`crate::registry`]. [`builtin_registry`] wires them into a ready-to-use
//! [`PluginRegistry`].

pub mod decimate;
pub mod document;
pub mod obj;
pub mod stl;

pub use decimate::{DecimationReport, DecimationSettings, QuadricEdgeCollapse, decimate};
pub use document::{Material, MeshDocument, MeshStats};
pub use obj::{ObjExporter, ObjImporter};
pub use stl::{StlExporter, StlImporter};

use crate::registry::PluginRegistry;

/// Registry with every built-in codec and the decimation filter.
///
/// Extensions are registered in lower and upper case since lookups are
/// case-sensitive.
pub fn builtin_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();

    for ext in ["obj", "OBJ"] {
        registry.register_importer(ext, Box::new(ObjImporter));
        registry.register_exporter(ext, Box::new(ObjExporter));
    }
    for ext in ["stl", "STL"] {
        registry.register_importer(ext, Box::new(StlImporter));
        registry.register_exporter(ext, Box::new(StlExporter));
    }
    registry.register_filter(Box::new(QuadricEdgeCollapse));

    registry
}
