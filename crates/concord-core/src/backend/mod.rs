//! Extraction backends and the contract they share.

pub mod command;
pub mod lines;
pub mod registry;
pub mod table;
pub mod text;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::config::{BackendKind, BackendSpec, ExtractionConfig};
use crate::models::document::{Document, ParserResult};

pub use command::CommandBackend;
pub use lines::LinesBackend;
pub use registry::{BackendRegistry, BackendSelection, Eligibility, RegisteredBackend};
pub use table::TableBackend;

/// An extraction backend.
///
/// `extract` reports every failure inside the returned [`ParserResult`]
/// (`success == false`, non-empty `errors`). It has no error channel.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Registered backend name.
    fn name(&self) -> &str;

    /// Extract line items and totals from a document.
    async fn extract(&self, document: &Document) -> ParserResult;
}

/// Whether a backend can run in the current environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Always,
    RequiresEnv(Vec<String>),
}

impl Availability {
    pub fn from_required(variables: &[String]) -> Self {
        if variables.is_empty() {
            Availability::Always
        } else {
            Availability::RequiresEnv(variables.to_vec())
        }
    }

    /// First required variable that `is_set` reports as missing.
    pub fn missing<F>(&self, is_set: F) -> Option<&str>
    where
        F: Fn(&str) -> bool,
    {
        match self {
            Availability::Always => None,
            Availability::RequiresEnv(vars) => {
                vars.iter().map(String::as_str).find(|v| !is_set(v))
            }
        }
    }
}

/// True when the variable is set to a non-empty value.
pub fn env_is_set(variable: &str) -> bool {
    std::env::var_os(variable).is_some_and(|v| !v.is_empty())
}

/// Instantiate the backend described by a spec.
pub fn build(spec: &BackendSpec, extraction: &ExtractionConfig) -> Arc<dyn Backend> {
    match &spec.kind {
        BackendKind::Table => Arc::new(TableBackend::new(&spec.name, extraction.clone())),
        BackendKind::Lines => Arc::new(LinesBackend::new(&spec.name, extraction.clone())),
        BackendKind::Command { program, args } => Arc::new(
            CommandBackend::new(&spec.name, program, args.clone())
                .with_required_env(spec.required_env.clone()),
        ),
    }
}

/// Run CPU-bound parsing off the async worker threads.
pub(crate) async fn run_blocking<F>(backend: &str, parse: F) -> ParserResult
where
    F: FnOnce() -> ParserResult + Send + 'static,
{
    match tokio::task::spawn_blocking(parse).await {
        Ok(result) => result,
        Err(e) => {
            let err = BackendError::Panicked {
                backend: backend.to_string(),
                message: e.to_string(),
            };
            ParserResult::failed(backend, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_availability_missing() {
        let availability = Availability::from_required(&["A".to_string(), "B".to_string()]);
        assert_eq!(availability.missing(|v| v == "A"), Some("B"));
        assert_eq!(availability.missing(|_| true), None);
        assert_eq!(Availability::from_required(&[]).missing(|_| false), None);
    }

    #[test]
    fn test_build_uses_spec_name() {
        let spec = BackendSpec::new("primary", BackendKind::Table);
        let backend = build(&spec, &ExtractionConfig::default());
        assert_eq!(backend.name(), "primary");
    }

    #[tokio::test]
    async fn test_run_blocking_contains_panic() {
        let result = run_blocking("table", || panic!("bad row")).await;
        assert!(!result.success);
        assert_eq!(result.parser_name, "table");
        assert!(result.errors[0].contains("panicked"));
    }
}
