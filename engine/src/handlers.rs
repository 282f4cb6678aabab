//! Command handlers for CLI operations
//!
//! Each handler takes the loaded configuration and an output format, does its
//! work and prints the result for a human or a script.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::storage::{open_backend, Persistence, ReadOutcome};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Run the board server until Ctrl+C
pub async fn handle_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState::from_config(&config).await;
    api::serve(&config, state).await
}

/// List items from the configured storage
///
/// Reads the backend directly; a running server is not required.
pub async fn handle_items_list(config: &Config, format: OutputFormat) -> Result<()> {
    let backend = open_backend(&config.storage, &config.core.data_dir)
        .await
        .context("Failed to open storage backend")?;
    let outcome = Persistence::new(backend).read().await;

    if let ReadOutcome::Degraded { reason, .. } = &outcome {
        eprintln!("warning: storage degraded ({}); showing fallback items", reason);
    }
    let degraded = outcome.is_degraded();
    let items = outcome.into_items();

    match format {
        OutputFormat::Text => {
            if items.is_empty() {
                println!("The board is empty.");
                return Ok(());
            }
            println!("{:<32} {:<20} {:>8} {:>8} {:>7} {:>7}", "ID", "KIND", "X", "Y", "W", "H");
            for item in &items {
                println!(
                    "{:<32} {:<20} {:>8.0} {:>8.0} {:>7.0} {:>7.0}",
                    item.id, item.kind, item.x, item.y, item.width, item.height
                );
            }
            println!();
            println!("{} item(s)", items.len());
        }
        OutputFormat::Json => {
            let output = json!({
                "degraded": degraded,
                "items": items,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            print!("{}", rendered);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

/// Print the configuration file path in use
pub fn handle_config_path(path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => {
            let output = json!({ "path": path.display().to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
