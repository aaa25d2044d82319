//! Simplification invoker.

use crate::engine::MeshDocument;
use crate::registry::{CapabilityRegistry, ParameterSet, ProcessingError};
use thiserror::Error;

/// Display name the simplification capability is registered under
pub const QUADRIC_EDGE_COLLAPSE_FILTER: &str = "Simplification: Quadric Edge Collapse Decimation";

#[derive(Error, Debug)]
pub enum SimplifyError {
    #[error("Filter \"{name}\" is not registered")]
    FilterNotFound { name: String },

    #[error("Filter \"{name}\" failed")]
    Apply {
        name: String,
        #[source]
        source: ProcessingError,
    },
}

/// Resolves the decimation filter by name and applies it to a document
pub struct Simplifier<'a> {
    registry: &'a dyn CapabilityRegistry,
}

impl<'a> Simplifier<'a> {
    pub fn new(registry: &'a dyn CapabilityRegistry) -> Self {
        Self { registry }
    }

    pub fn simplify(
        &self,
        document: &mut MeshDocument,
        parameters: &ParameterSet,
    ) -> Result<(), SimplifyError> {
        let filter = self
            .registry
            .lookup_named_filter(QUADRIC_EDGE_COLLAPSE_FILTER)
            .ok_or_else(|| SimplifyError::FilterNotFound {
                name: QUADRIC_EDGE_COLLAPSE_FILTER.to_string(),
            })?;

        filter
            .apply(document, parameters)
            .map_err(|source| SimplifyError::Apply {
                name: QUADRIC_EDGE_COLLAPSE_FILTER.to_string(),
                source,
            })
    }
}
