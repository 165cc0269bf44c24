//! Configuration structures for the extraction ensemble.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::document::DEFAULT_CURRENCY;
use crate::error::{ConcordError, Result};

/// Main configuration for the concord pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcordConfig {
    /// Parallel dispatch configuration.
    pub dispatch: DispatchConfig,

    /// Auto-selection strategy configuration.
    pub auto: AutoConfig,

    /// Text extraction rules shared by built-in backends.
    pub extraction: ExtractionConfig,

    /// Backends registered at startup.
    pub backends: Vec<BackendSpec>,
}

impl Default for ConcordConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            auto: AutoConfig::default(),
            extraction: ExtractionConfig::default(),
            backends: default_backends(),
        }
    }
}

/// Parallel dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Time budget for each backend, in seconds.
    pub backend_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backend_timeout_secs: 60,
        }
    }
}

impl DispatchConfig {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}

/// Auto-selection strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoConfig {
    /// Backends to try, most reliable first.
    pub order: Vec<String>,

    /// Confidence at which a single backend is accepted (0.0 - 1.0).
    pub confidence_threshold: f64,

    /// Number of leading backends used for the ensemble fallback.
    pub fallback_width: usize,
}

impl Default for AutoConfig {
    fn default() -> Self {
        Self {
            order: ["table", "lines", "textract", "docai", "ocr"]
                .into_iter()
                .map(String::from)
                .collect(),
            confidence_threshold: 0.7,
            fallback_width: 3,
        }
    }
}

/// Rules shared by the built-in text backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Currency code used when none is detected.
    pub default_currency: String,

    /// Skip pages that look like rate schedules rather than quoted items.
    pub skip_rate_schedules: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            skip_rate_schedules: true,
        }
    }
}

/// A backend registered under a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Registered name, as used in requests.
    pub name: String,

    /// Implementation to use.
    pub kind: BackendKind,

    /// Environment variables that must be set for the backend to be eligible.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_env: Vec<String>,
}

/// Built-in backend implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendKind {
    /// Delimited table reader.
    Table,
    /// Free-text line reader.
    Lines,
    /// External program speaking the JSON result contract.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl BackendKind {
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Table => "table",
            BackendKind::Lines => "lines",
            BackendKind::Command { .. } => "command",
        }
    }
}

impl BackendSpec {
    pub fn new(name: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required_env: Vec::new(),
        }
    }

    pub fn requiring(mut self, variable: impl Into<String>) -> Self {
        self.required_env.push(variable.into());
        self
    }

    fn command(name: &str, program: &str) -> Self {
        Self::new(
            name,
            BackendKind::Command {
                program: program.to_string(),
                args: vec!["{filename}".to_string()],
            },
        )
    }
}

/// The default backend set: two local text readers, OCR, two cloud services
/// gated on their credentials, and a layout partitioner that switches to its
/// hosted API when `UNSTRUCTURED_API_KEY` is set.
pub fn default_backends() -> Vec<BackendSpec> {
    vec![
        BackendSpec::new("table", BackendKind::Table),
        BackendSpec::new("lines", BackendKind::Lines),
        BackendSpec::command("ocr", "concord-ocr"),
        BackendSpec::command("textract", "concord-textract").requiring("AWS_ACCESS_KEY_ID"),
        BackendSpec::command("docai", "concord-docai")
            .requiring("GOOGLE_APPLICATION_CREDENTIALS"),
        BackendSpec::command("unstructured", "concord-unstructured"),
    ]
}

impl ConcordConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.backend_timeout_secs == 0 {
            return Err(ConcordError::Config(
                "dispatch.backend_timeout_secs must be positive".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.auto.confidence_threshold) {
            return Err(ConcordError::Config(format!(
                "auto.confidence_threshold must be within 0..=1, got {}",
                self.auto.confidence_threshold
            )));
        }

        if self.auto.fallback_width == 0 {
            return Err(ConcordError::Config(
                "auto.fallback_width must be at least 1".to_string(),
            ));
        }

        let mut tried = HashSet::new();
        for name in &self.auto.order {
            if !tried.insert(name.as_str()) {
                return Err(ConcordError::Config(format!(
                    "auto.order lists '{}' more than once",
                    name
                )));
            }
        }

        let mut seen = HashSet::new();
        for spec in &self.backends {
            if spec.name.trim().is_empty() {
                return Err(ConcordError::Config("backend name is empty".to_string()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConcordError::Config(format!(
                    "backend '{}' is registered twice",
                    spec.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ConcordConfig::default();
        assert_eq!(config.dispatch.backend_timeout(), Duration::from_secs(60));
        assert_eq!(config.auto.confidence_threshold, 0.7);
        assert_eq!(config.auto.fallback_width, 3);
        assert_eq!(config.extraction.default_currency, "NZD");
        assert_eq!(config.backends.len(), 6);
        assert_eq!(config.backends[5].name, "unstructured");
        assert!(config.backends[5].required_env.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ConcordConfig = serde_json::from_str(
            r#"{
                "dispatch": {"backend_timeout_secs": 5},
                "backends": [
                    {"name": "table", "kind": {"type": "table"}},
                    {"name": "cloud", "kind": {"type": "command", "program": "cloud-extract"},
                     "required_env": ["CLOUD_KEY"]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.dispatch.backend_timeout_secs, 5);
        assert_eq!(config.auto.order[0], "table");
        assert_eq!(
            config.backends[1].kind,
            BackendKind::Command {
                program: "cloud-extract".to_string(),
                args: vec![],
            }
        );
        assert_eq!(config.backends[1].required_env, vec!["CLOUD_KEY".to_string()]);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = ConcordConfig::default();
        config.backends.push(BackendSpec::new("table", BackendKind::Lines));
        assert!(matches!(config.validate(), Err(ConcordError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_repeated_auto_order() {
        let mut config = ConcordConfig::default();
        config.auto.order = vec!["table".into(), "lines".into(), "table".into()];
        assert!(matches!(
            config.validate(),
            Err(ConcordError::Config(msg)) if msg.contains("'table'")
        ));
    }

    #[test]
    fn test_validate_rejects_zero_fallback_width() {
        let mut config = ConcordConfig::default();
        config.auto.fallback_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = ConcordConfig::default();
        config.dispatch.backend_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
