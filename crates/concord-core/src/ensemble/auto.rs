//! Sequential auto-selection with early exit.

use tokio::time::Instant;
use tracing::{debug, info};

use super::assemble;
use super::dispatcher::{Dispatcher, run_backend};
use super::request::ExtractionRequest;
use crate::backend::BackendSelection;
use crate::models::config::AutoConfig;
use crate::models::document::Document;
use crate::models::ensemble::AutoOutcome;

/// Tries backends one at a time in reliability order and stops at the first
/// confident answer. Falls back to a full ensemble over the leading backends.
pub struct AutoStrategy<'a> {
    dispatcher: &'a Dispatcher,
    config: &'a AutoConfig,
}

impl<'a> AutoStrategy<'a> {
    pub fn new(dispatcher: &'a Dispatcher, config: &'a AutoConfig) -> Self {
        Self { dispatcher, config }
    }

    pub async fn run(&self, document: &Document) -> AutoOutcome {
        let started = Instant::now();
        let registry = self.dispatcher.registry();
        let mut tried = Vec::new();

        for name in &self.config.order {
            let Some(backend) = registry.get(name) else {
                debug!("Auto: {} is not registered, skipping", name);
                continue;
            };

            tried.push(name.clone());
            let result = run_backend(backend, document, self.dispatcher.timeout()).await;

            if result.success && result.confidence_score >= self.config.confidence_threshold {
                info!(
                    "Auto: selected {} (confidence {:.2}) after {} attempts",
                    name,
                    result.confidence_score,
                    tried.len()
                );
                return AutoOutcome::Selected {
                    selected_parser: name.clone(),
                    result,
                    tried_parsers: tried,
                };
            }

            debug!(
                "Auto: {} not accepted (success={}, confidence {:.2})",
                name, result.success, result.confidence_score
            );
        }

        let leading = self
            .config
            .order
            .iter()
            .take(self.config.fallback_width)
            .cloned()
            .collect();
        let names = registry.resolve(&BackendSelection::Named(leading));

        info!(
            "Auto: no backend reached {:.2}, running ensemble over {:?}",
            self.config.confidence_threshold, names
        );

        let request = ExtractionRequest::from_parts(document.clone(), names);
        let results = self.dispatcher.dispatch(&request).await;

        AutoOutcome::Ensemble(assemble(results, document.filename(), started.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::testing::{Stub, document, item, registry};
    use crate::models::ensemble::Recommendation;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn config(order: &[&str]) -> AutoConfig {
        AutoConfig {
            order: order.iter().map(|s| s.to_string()).collect(),
            ..AutoConfig::default()
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_confident_backend() {
        let later = Stub::ok("ocr", 0.95, vec![item("Widget", 1.0, 1.0)]);
        let later_calls = later.calls();

        let dispatcher = Dispatcher::new(registry(vec![
            Stub::failing("table"),
            Stub::ok("lines", 0.75, vec![item("Widget", 1.0, 1.0)]),
            later,
        ]));
        let config = config(&["table", "textract", "lines", "ocr"]);

        let outcome = AutoStrategy::new(&dispatcher, &config).run(&document()).await;

        match outcome {
            AutoOutcome::Selected {
                selected_parser,
                result,
                tried_parsers,
            } => {
                assert_eq!(selected_parser, "lines");
                assert_eq!(result.confidence_score, 0.75);
                assert_eq!(tried_parsers, vec!["table".to_string(), "lines".to_string()]);
            }
            other => panic!("expected a selected backend, got {other:?}"),
        }
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let dispatcher = Dispatcher::new(registry(vec![Stub::ok("table", 0.7, Vec::new())]));
        let config = config(&["table"]);

        let outcome = AutoStrategy::new(&dispatcher, &config).run(&document()).await;

        assert!(matches!(outcome, AutoOutcome::Selected { .. }));
    }

    #[tokio::test]
    async fn test_falls_back_to_leading_ensemble() {
        let fourth = Stub::ok("docai", 0.5, vec![item("Widget", 1.0, 1.0)]);
        let fourth_calls = fourth.calls();

        let dispatcher = Dispatcher::new(registry(vec![
            Stub::ok("table", 0.6, vec![item("Widget", 1.0, 1.0)]),
            Stub::ok("lines", 0.5, vec![item("widget", 1.0, 3.0)]),
            Stub::failing("ocr"),
            fourth,
        ]));
        let config = config(&["table", "lines", "ocr", "docai"]);

        let outcome = AutoStrategy::new(&dispatcher, &config).run(&document()).await;

        let AutoOutcome::Ensemble(ensemble) = outcome else {
            panic!("expected ensemble fallback");
        };
        assert_eq!(ensemble.all_results.len(), 3);
        assert_eq!(ensemble.consensus_items.len(), 1);
        assert_eq!(ensemble.consensus_items[0].item.total_price, 2.0);
        assert_eq!(ensemble.recommendation, Recommendation::LowConfidenceManualReview);
        // tried once in sequence, not part of the ensemble
        assert_eq!(fourth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let dispatcher = Dispatcher::new(registry(vec![
            Stub::ok("table", 0.99, Vec::new()).delayed(Duration::from_secs(600)),
            Stub::ok("lines", 0.8, Vec::new()),
        ]));
        let config = config(&["table", "lines"]);

        let outcome = AutoStrategy::new(&dispatcher, &config).run(&document()).await;

        let AutoOutcome::Selected { selected_parser, .. } = outcome else {
            panic!("expected lines to be selected");
        };
        assert_eq!(selected_parser, "lines");
    }
}
