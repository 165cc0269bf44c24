//! Subcommands and the helpers they share.

pub mod auto;
pub mod backends;
pub mod batch;
pub mod config;
pub mod extract;
pub mod output;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use concord_core::{ConcordConfig, Document};

/// Default configuration location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("concord")
        .join("config.json")
}

/// Resolve the config file to use: explicit path, then the default location.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration from an explicit path, the default location, or
/// built-in defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<ConcordConfig> {
    if let Some(path) = explicit {
        return Ok(ConcordConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(ConcordConfig::from_file(&path)?)
    } else {
        Ok(ConcordConfig::default())
    }
}

/// Read a document, rejecting missing and empty files.
pub fn load_document(path: &Path) -> anyhow::Result<Document> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        anyhow::bail!("Input file is empty: {}", path.display());
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();

    debug!("Loaded {} ({} bytes)", filename, bytes.len());
    Ok(Document::new(bytes, filename))
}

/// Write to a file, or to stdout when no path is given.
pub fn write_output(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Spinner shown on stderr while backends run.
pub fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}
