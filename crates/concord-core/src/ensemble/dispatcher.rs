//! Parallel backend dispatch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::request::ExtractionRequest;
use crate::backend::{Backend, BackendRegistry};
use crate::error::BackendError;
use crate::models::document::{Document, ParserResult, clamp_confidence};

/// Time budget for a single backend.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs the requested backends concurrently, one task each.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    /// Set the per-backend timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run every backend in the request and collect one result per backend,
    /// in completion order.
    pub async fn dispatch(&self, request: &ExtractionRequest) -> Vec<ParserResult> {
        let names = request.backends();
        info!(
            "Dispatching {} backends for {}",
            names.len(),
            request.document().filename()
        );

        let mut results = Vec::with_capacity(names.len());
        let mut pending = Vec::with_capacity(names.len());
        let mut tasks = JoinSet::new();

        for name in names {
            let Some(backend) = self.registry.get(name) else {
                warn!("Backend {} is not registered", name);
                results.push(ParserResult::failed(
                    name,
                    format!("backend '{name}' is not registered"),
                ));
                continue;
            };

            let document = request.document().clone();
            let timeout = self.timeout;
            tasks.spawn(async move { run_backend(backend, &document, timeout).await });
            pending.push(name.clone());
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    debug!(
                        "{} finished: success={}, {} items, confidence {:.2}",
                        result.parser_name,
                        result.success,
                        result.items.len(),
                        result.confidence_score
                    );
                    pending.retain(|n| *n != result.parser_name);
                    results.push(result);
                }
                Err(e) => warn!("Backend task ended abnormally: {}", e),
            }
        }

        for name in pending {
            let err = BackendError::TaskLost(name.clone());
            results.push(ParserResult::failed(name, err.to_string()));
        }

        results
    }
}

/// Run one backend with timeout and panic containment.
///
/// The returned result always carries `name`, a confidence in `[0, 1]`,
/// non-negative amounts and, when unsuccessful, zero confidence and at least
/// one error.
pub(crate) async fn run_backend(
    backend: Arc<dyn Backend>,
    document: &Document,
    timeout: Duration,
) -> ParserResult {
    let name = backend.name().to_string();
    let started = Instant::now();

    let guarded = AssertUnwindSafe(backend.extract(document)).catch_unwind();

    let mut result = match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => {
            let err = BackendError::Panicked {
                backend: name.clone(),
                message: panic_message(panic.as_ref()),
            };
            warn!("{}", err);
            ParserResult::failed(&name, err.to_string())
        }
        Err(_) => {
            let err = BackendError::Timeout {
                backend: name.clone(),
                after: timeout,
            };
            warn!("{}", err);
            ParserResult::failed(&name, err.to_string())
        }
    };

    normalize(&mut result, &name, started.elapsed());
    result
}

fn normalize(result: &mut ParserResult, name: &str, elapsed: Duration) {
    if result.parser_name != name {
        result.parser_name = name.to_string();
    }

    // A failed backend carries no confidence, whatever it reported.
    result.confidence_score = if result.success {
        clamp_confidence(result.confidence_score)
    } else {
        0.0
    };

    for item in &mut result.items {
        item.clamp_amounts();
    }
    result.financials.clamp_amounts();

    if result.extraction_time_ms == 0 {
        result.extraction_time_ms = elapsed.as_millis() as u64;
    }

    if !result.success && result.errors.is_empty() {
        result
            .errors
            .push(format!("{name} reported failure without an error"));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
