//! Backend registry and request-time backend resolution.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Availability, Backend, build, env_is_set};
use crate::models::config::ConcordConfig;

/// A backend together with what it needs to run.
#[derive(Clone)]
pub struct RegisteredBackend {
    pub backend: Arc<dyn Backend>,
    pub availability: Availability,
    /// Implementation label, e.g. `table` or `command`.
    pub kind: String,
}

impl fmt::Debug for RegisteredBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredBackend")
            .field("name", &self.backend.name())
            .field("availability", &self.availability)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Name to backend mapping, fixed once a request is being served.
#[derive(Default)]
pub struct BackendRegistry {
    entries: Vec<RegisteredBackend>,
    index: HashMap<String, usize>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every backend named in the configuration.
    pub fn from_config(config: &ConcordConfig) -> Self {
        let mut registry = Self::new();
        for spec in &config.backends {
            let backend = build(spec, &config.extraction);
            registry.register_with(
                backend,
                Availability::from_required(&spec.required_env),
                spec.kind.label(),
            );
        }
        info!("Registered {} backends", registry.len());
        registry
    }

    /// Register an always-available backend.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.register_with(backend, Availability::Always, "custom");
    }

    /// Register a backend, replacing any earlier one of the same name.
    pub fn register_with(
        &mut self,
        backend: Arc<dyn Backend>,
        availability: Availability,
        kind: &str,
    ) {
        let name = backend.name().to_string();
        debug!("Registering backend: {}", name);

        let entry = RegisteredBackend {
            backend,
            availability,
            kind: kind.to_string(),
        };

        match self.index.get(&name) {
            Some(&idx) => {
                warn!("Backend {} registered twice; keeping the later one", name);
                self.entries[idx] = entry;
            }
            None => {
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.index
            .get(name)
            .map(|&idx| Arc::clone(&self.entries[idx].backend))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.backend.name()).collect()
    }

    pub fn entries(&self) -> &[RegisteredBackend] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Which backends can run with the current environment.
    pub fn eligibility(&self) -> Eligibility {
        self.eligibility_with(env_is_set)
    }

    /// Eligibility against an arbitrary environment lookup.
    pub fn eligibility_with<F>(&self, is_set: F) -> Eligibility
    where
        F: Fn(&str) -> bool,
    {
        let mut eligibility = Eligibility::default();

        for entry in &self.entries {
            let name = entry.backend.name().to_string();
            match entry.availability.missing(&is_set) {
                None => eligibility.eligible.push(name),
                Some(variable) => eligibility.unavailable.push((name, variable.to_string())),
            }
        }

        eligibility
    }

    /// Resolve a selection to registered names: order kept, duplicates
    /// collapsed, unknown names dropped.
    pub fn resolve(&self, selection: &BackendSelection) -> Vec<String> {
        self.resolve_with(selection, env_is_set)
    }

    pub fn resolve_with<F>(&self, selection: &BackendSelection, is_set: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        match selection {
            BackendSelection::All => self.eligibility_with(is_set).eligible,
            BackendSelection::Named(names) => {
                let mut seen = HashSet::new();
                let mut resolved = Vec::new();

                for name in names {
                    if !self.contains(name) {
                        warn!("Unknown backend '{}' ignored", name);
                        continue;
                    }
                    if seen.insert(name.as_str()) {
                        resolved.push(name.clone());
                    }
                }

                resolved
            }
        }
    }
}

/// Backends partitioned by whether their requirements are met.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Eligibility {
    pub eligible: Vec<String>,
    /// Backend name and the first missing variable.
    pub unavailable: Vec<(String, String)>,
}

impl Eligibility {
    pub fn is_eligible(&self, name: &str) -> bool {
        self.eligible.iter().any(|n| n == name)
    }
}

/// Which backends a request asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackendSelection {
    /// Every backend whose requirements are met.
    #[default]
    All,
    Named(Vec<String>),
}

impl FromStr for BackendSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(BackendSelection::All);
        }

        Ok(BackendSelection::Named(
            s.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}
