//! Backends command - list what is registered and what can run.

use clap::Args;
use console::style;
use serde::Serialize;

use concord_core::{Availability, BackendRegistry};

use super::load_config;

/// Arguments for the backends command.
#[derive(Args)]
pub struct BackendsArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct BackendInfo<'a> {
    name: &'a str,
    kind: &'a str,
    requires: Vec<&'a str>,
    available: bool,
}

pub fn run(args: BackendsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = BackendRegistry::from_config(&config);
    let eligibility = registry.eligibility();

    let infos: Vec<BackendInfo<'_>> = registry
        .entries()
        .iter()
        .map(|entry| BackendInfo {
            name: entry.backend.name(),
            kind: &entry.kind,
            requires: match &entry.availability {
                Availability::Always => Vec::new(),
                Availability::RequiresEnv(vars) => vars.iter().map(String::as_str).collect(),
            },
            available: eligibility.is_eligible(entry.backend.name()),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("{}", style("Registered backends:").bold());
    for info in &infos {
        let status = if info.available {
            style("available").green()
        } else {
            style("unavailable").yellow()
        };
        let requires = if info.requires.is_empty() {
            String::new()
        } else {
            format!(" (requires {})", info.requires.join(", "))
        };
        println!("  {:<10} {:<8} {}{}", info.name, info.kind, status, requires);
    }

    if !eligibility.unavailable.is_empty() {
        println!();
        for (name, variable) in &eligibility.unavailable {
            println!(
                "{} {} is skipped by 'all' until {} is set",
                style("ℹ").blue(),
                name,
                variable
            );
        }
    }

    Ok(())
}
