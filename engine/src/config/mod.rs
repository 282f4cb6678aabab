//! Configuration management
//!
//! This module handles loading, validation, and management of the Pinboard configuration.
//! Configuration is stored in TOML format at ~/.pinboard/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **server**: Bind address for the boundary API
//! - **storage**: Which backend holds the item collection, and where
//! - **canvas**: Working bounds and stacking gap used by auto-placement
//! - **live**: Keep-alive interval and per-viewer buffer size
//!
//! # Environment Overrides
//!
//! `PINBOARD_PORT` and `PINBOARD_STORAGE` override `server.port` and
//! `storage.backend` after the file is parsed and before validation.
//!
//! # Examples
//!
//! ```no_run
//! use pinboard_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Backend: {}", config.storage.backend);
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! # Ok(())
//! # }
//! ```

use sdk::errors::BoardError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::placement::WorkingBounds;

/// Storage backends understood by `storage::open_backend`
pub const VALID_BACKENDS: [&str; 3] = ["memory", "file", "sqlite"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    pub core: CoreConfig,

    /// Boundary API bind address
    #[serde(default)]
    pub server: ServerConfig,

    /// Item collection backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Auto-placement settings
    #[serde(default)]
    pub canvas: CanvasConfig,

    /// Live channel settings
    #[serde(default)]
    pub live: LiveConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Boundary API bind address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend name (memory, file, sqlite)
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Backend location; defaults to a file inside `core.data_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Working bounds of the canvas used when seeding random positions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default)]
    pub min_x: f64,

    #[serde(default)]
    pub min_y: f64,

    #[serde(default = "default_max_x")]
    pub max_x: f64,

    #[serde(default = "default_max_y")]
    pub max_y: f64,

    /// Vertical padding between a stacked item and the lowest existing item
    #[serde(default = "default_gap")]
    pub gap: f64,
}

/// Live channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Seconds between keep-alive pings on each live connection
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// Events buffered per viewer before it is considered dead
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.pinboard")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4600
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_max_x() -> f64 {
    4000.0
}

fn default_max_y() -> f64 {
    3000.0
}

fn default_gap() -> f64 {
    40.0
}

fn default_keepalive_secs() -> u64 {
    25
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: default_max_x(),
            max_y: default_max_y(),
            gap: default_gap(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            canvas: CanvasConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl CanvasConfig {
    /// Working bounds for the placement engine
    pub fn bounds(&self) -> WorkingBounds {
        WorkingBounds {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.max_x,
            max_y: self.max_y,
        }
    }
}

impl StorageConfig {
    /// Resolve the backend location, falling back to a file in the data directory
    pub fn resolved_path(&self, data_dir: &Path) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None if self.backend == "sqlite" => data_dir.join("board.db"),
            None => data_dir.join("board.json"),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.pinboard/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, BoardError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, BoardError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| BoardError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_toml_str(contents: &str) -> Result<Self, BoardError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| BoardError::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, BoardError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BoardError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| BoardError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| BoardError::Config(format!("Failed to write config file: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.pinboard/config.toml)
    pub fn default_config_path() -> Result<PathBuf, BoardError> {
        let home = dirs::home_dir()
            .ok_or_else(|| BoardError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".pinboard").join("config.toml"))
    }

    /// Apply `PINBOARD_PORT` and `PINBOARD_STORAGE`
    fn apply_env_overrides(&mut self) -> Result<(), BoardError> {
        if let Ok(port) = std::env::var("PINBOARD_PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                BoardError::Config(format!("PINBOARD_PORT is not a valid port: '{}'", port))
            })?;
        }

        if let Ok(backend) = std::env::var("PINBOARD_STORAGE") {
            self.storage.backend = backend.trim().to_lowercase();
        }

        Ok(())
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated and numeric settings
    /// - Expands ~ in paths
    /// - Creates the data directory if it doesn't exist
    pub fn validate_and_process(&mut self) -> Result<(), BoardError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(BoardError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !VALID_BACKENDS.contains(&self.storage.backend.as_str()) {
            return Err(BoardError::Config(format!(
                "Invalid storage backend '{}'. Must be one of: {}",
                self.storage.backend,
                VALID_BACKENDS.join(", ")
            )));
        }

        let canvas = &self.canvas;
        let coords = [canvas.min_x, canvas.min_y, canvas.max_x, canvas.max_y];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(BoardError::Config(
                "canvas bounds must be finite numbers".to_string(),
            ));
        }
        if canvas.min_x >= canvas.max_x || canvas.min_y >= canvas.max_y {
            return Err(BoardError::Config(
                "canvas min_x/min_y must be less than max_x/max_y".to_string(),
            ));
        }
        if !(canvas.max_x - canvas.min_x).is_finite() || !(canvas.max_y - canvas.min_y).is_finite() {
            return Err(BoardError::Config(
                "canvas width and height must be finite".to_string(),
            ));
        }
        if !canvas.gap.is_finite() || canvas.gap < 0.0 {
            return Err(BoardError::Config(
                "canvas gap must be zero or positive".to_string(),
            ));
        }

        if self.live.keepalive_secs == 0 {
            return Err(BoardError::Config(
                "live keepalive_secs must be at least 1".to_string(),
            ));
        }
        if self.live.channel_capacity == 0 {
            return Err(BoardError::Config(
                "live channel_capacity must be at least 1".to_string(),
            ));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        if let Some(path) = &self.storage.path {
            self.storage.path = Some(expand_path(path)?);
        }

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                BoardError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, BoardError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| BoardError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| BoardError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| BoardError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.server.port, 4600);
        assert_eq!(config.live.keepalive_secs, 25);
        assert_eq!(config.canvas.gap, 40.0);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_resolved_storage_path() {
        let data_dir = PathBuf::from("/data");
        let mut storage = StorageConfig::default();
        assert_eq!(
            storage.resolved_path(&data_dir),
            PathBuf::from("/data/board.json")
        );

        storage.backend = "sqlite".to_string();
        assert_eq!(
            storage.resolved_path(&data_dir),
            PathBuf::from("/data/board.db")
        );

        storage.path = Some(PathBuf::from("/elsewhere/items.db"));
        assert_eq!(
            storage.resolved_path(&data_dir),
            PathBuf::from("/elsewhere/items.db")
        );
    }

    #[test]
    fn test_canvas_bounds_mapping() {
        let bounds = CanvasConfig::default().bounds();
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.max_x, 4000.0);
        assert_eq!(bounds.max_y, 3000.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.storage.backend, deserialized.storage.backend);
        assert_eq!(config.canvas.max_y, deserialized.canvas.max_y);
    }
}
