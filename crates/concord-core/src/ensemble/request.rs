//! Validated extraction requests.

use tracing::debug;

use crate::backend::{BackendRegistry, BackendSelection};
use crate::error::{ConcordError, Result};
use crate::models::document::Document;

/// A document plus the backends to run against it.
///
/// Backend names are already resolved against the registry: they are all
/// registered, in request order, without duplicates.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    document: Document,
    backends: Vec<String>,
}

impl ExtractionRequest {
    /// Validate a request. Empty documents are rejected before any backend runs.
    pub fn new(
        document: Document,
        selection: &BackendSelection,
        registry: &BackendRegistry,
    ) -> Result<Self> {
        if document.is_empty() {
            return Err(ConcordError::EmptyDocument(document.filename().to_string()));
        }

        let backends = registry.resolve(selection);
        debug!(
            "Request for {} resolved to backends {:?}",
            document.filename(),
            backends
        );

        Ok(Self { document, backends })
    }

    /// Build a request from names the caller has already resolved.
    pub(crate) fn from_parts(document: Document, backends: Vec<String>) -> Self {
        Self { document, backends }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn backends(&self) -> &[String] {
        &self.backends
    }
}
