//! Core library for multi-backend line-item extraction.
//!
//! This crate provides:
//! - A uniform backend contract with table, free-text and external-command backends
//! - Parallel dispatch with per-backend timeouts and panic containment
//! - Consensus reconciliation, best-result selection and agreement scoring
//! - Auto-selection that stops at the first confident backend

pub mod error;
pub mod models;
pub mod rules;
pub mod backend;
pub mod ensemble;

pub use error::{BackendError, ConcordError, Result};
pub use models::config::{BackendKind, BackendSpec, ConcordConfig};
pub use models::document::{Document, Financials, LineItem, ParserResult};
pub use models::ensemble::{
    AutoOutcome, ConfidenceBreakdown, ConsensusItem, ConsensusLevel, EnsembleMetadata,
    EnsembleResult, Recommendation,
};
pub use backend::{Availability, Backend, BackendRegistry, BackendSelection, Eligibility};
pub use ensemble::{Dispatcher, EnsembleCoordinator, ExtractionRequest};
