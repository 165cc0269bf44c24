//! Ensemble orchestration: dispatch, reconciliation and scoring.

pub mod agreement;
pub mod auto;
pub mod consensus;
pub mod dispatcher;
pub mod recommendation;
pub mod request;
pub mod selector;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::info;

pub use agreement::cross_model_agreement;
pub use auto::AutoStrategy;
pub use consensus::{build_consensus, item_key};
pub use dispatcher::{DEFAULT_BACKEND_TIMEOUT, Dispatcher};
pub use recommendation::{average_confidence, classify};
pub use request::ExtractionRequest;
pub use selector::select_best;

use crate::backend::{BackendRegistry, BackendSelection};
use crate::error::Result;
use crate::models::config::{AutoConfig, ConcordConfig};
use crate::models::document::{Document, ParserResult};
use crate::models::ensemble::{AutoOutcome, ConfidenceBreakdown, EnsembleMetadata, EnsembleResult};

/// Weight applied to the best backend's own confidence when it alone
/// outranks the ensemble average.
const BEST_RESULT_DISCOUNT: f64 = 0.9;

/// Entry point for full-ensemble and auto extraction.
pub struct EnsembleCoordinator {
    dispatcher: Dispatcher,
    auto: AutoConfig,
}

impl EnsembleCoordinator {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            auto: AutoConfig::default(),
        }
    }

    /// Registry, dispatcher timeout and auto strategy from configuration.
    pub fn from_config(config: &ConcordConfig) -> Self {
        let registry = Arc::new(BackendRegistry::from_config(config));
        let dispatcher = Dispatcher::new(registry).with_timeout(config.dispatch.backend_timeout());

        Self::new(dispatcher).with_auto_config(config.auto.clone())
    }

    pub fn with_auto_config(mut self, auto: AutoConfig) -> Self {
        self.auto = auto;
        self
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        self.dispatcher.registry()
    }

    /// Validate a request against this coordinator's registry.
    pub fn request(
        &self,
        document: Document,
        selection: &BackendSelection,
    ) -> Result<ExtractionRequest> {
        ExtractionRequest::new(document, selection, self.registry())
    }

    /// Run every requested backend and reconcile their results.
    pub async fn run(&self, request: &ExtractionRequest) -> EnsembleResult {
        let started = Instant::now();
        let results = self.dispatcher.dispatch(request).await;
        let ensemble = assemble(results, request.document().filename(), started.elapsed());

        info!(
            "Ensemble for {}: {}/{} backends succeeded, {} consensus items, {}",
            ensemble.extraction_metadata.file_name,
            ensemble.confidence_breakdown.parsers_succeeded,
            ensemble.confidence_breakdown.parsers_attempted,
            ensemble.consensus_items.len(),
            ensemble.recommendation
        );

        ensemble
    }

    /// Try backends in reliability order, stopping at the first confident one.
    pub async fn run_auto(&self, document: &Document) -> AutoOutcome {
        AutoStrategy::new(&self.dispatcher, &self.auto)
            .run(document)
            .await
    }
}

/// Reconcile raw backend results into an [`EnsembleResult`].
pub fn assemble(results: Vec<ParserResult>, file_name: &str, elapsed: Duration) -> EnsembleResult {
    let consensus_items = build_consensus(&results);
    let best_result = select_best(&results);
    let agreement = cross_model_agreement(&results);

    let parsers_succeeded = results.iter().filter(|r| r.success).count();
    let average = average_confidence(&results);
    let overall = average.max(best_result.confidence_score * BEST_RESULT_DISCOUNT);
    let recommendation = classify(parsers_succeeded, average);

    let confidence_breakdown = ConfidenceBreakdown {
        overall,
        parsers_succeeded,
        parsers_attempted: results.len(),
        cross_model_agreement: agreement,
        best_parser: best_result.parser_name.clone(),
        best_parser_confidence: best_result.confidence_score,
    };

    let extraction_metadata = EnsembleMetadata {
        total_extraction_time_ms: elapsed.as_millis() as u64,
        parsers_used: results.iter().map(|r| r.parser_name.clone()).collect(),
        file_name: file_name.to_string(),
        timestamp: Utc::now(),
    };

    EnsembleResult {
        best_result,
        all_results: results,
        consensus_items,
        confidence_breakdown,
        recommendation,
        extraction_metadata,
    }
}
