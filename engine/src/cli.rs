//! CLI interface for Pinboard
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for running and inspecting a board.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pinboard collaborative canvas
///
/// Serves a shared board of positioned items. Agents add and move items over
/// HTTP; every connected viewer sees changes and focus requests live.
#[derive(Parser, Debug)]
#[command(name = "pinboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the board server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect items in the configured storage
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Item inspection actions
#[derive(Subcommand, Debug)]
pub enum ItemsAction {
    /// List all items on the board
    List,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["pinboard", "serve"]);
        assert!(matches!(
            cli.command,
            Command::Serve {
                host: None,
                port: None
            }
        ));
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "pinboard",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/board.toml",
            "items",
            "list",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/board.toml")));
        assert!(matches!(
            cli.command,
            Command::Items {
                action: ItemsAction::List
            }
        ));
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from(["pinboard", "serve", "--host", "0.0.0.0", "-p", "8080"]);
        if let Command::Serve { host, port } = cli.command {
            assert_eq!(host.as_deref(), Some("0.0.0.0"));
            assert_eq!(port, Some(8080));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["pinboard", "config", "path"]);
        if let Command::Config { action } = cli.command {
            assert!(matches!(action, ConfigAction::Path));
        } else {
            panic!("Expected Config command");
        }
    }

    #[test]
    fn test_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["pinboard", "serve", "--port", "99999"]).is_err());
    }
}
