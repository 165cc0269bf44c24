//! External program backend.
//!
//! The program receives the document on stdin and prints a JSON
//! [`ParserResult`] on stdout. OCR engines and cloud document services are
//! plugged in this way.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Availability, Backend, env_is_set};
use crate::error::BackendError;
use crate::models::document::{Document, ParserResult};

/// Argument placeholder replaced by the document's file name.
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

pub struct CommandBackend {
    name: String,
    program: String,
    args: Vec<String>,
    availability: Availability,
}

impl CommandBackend {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            availability: Availability::Always,
        }
    }

    /// Refuse to run unless these environment variables are set.
    pub fn with_required_env(mut self, variables: Vec<String>) -> Self {
        self.availability = Availability::from_required(&variables);
        self
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    async fn run(&self, document: &Document) -> Result<ParserResult, BackendError> {
        if let Some(variable) = self.availability.missing(env_is_set) {
            return Err(BackendError::Unavailable {
                backend: self.name.clone(),
                variable: variable.to_string(),
            });
        }

        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(FILENAME_PLACEHOLDER, document.filename()))
            .collect();

        debug!("{}: running {} {:?}", self.name, self.program, args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // Programs may exit without reading all of stdin; the exit
                // status decides the outcome, not the broken pipe.
                let _ = stdin.write_all(document.bytes()).await;
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| {
            BackendError::InvalidOutput(format!("failed to collect output of {}: {e}", self.program))
        })?;

        if !output.status.success() {
            return Err(BackendError::ExitStatus {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut result: ParserResult = serde_json::from_slice(&output.stdout)
            .map_err(|e| BackendError::InvalidOutput(e.to_string()))?;
        result.parser_name = self.name.clone();

        Ok(result)
    }
}

#[async_trait]
impl Backend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, document: &Document) -> ParserResult {
        match self.run(document).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{}: {}", self.name, e);
                ParserResult::failed(&self.name, e.to_string())
            }
        }
    }
}
