//! Configuration for the registration server.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Command-line arguments for the registration server
#[derive(Parser, Debug, Default)]
#[command(name = "registrar-server")]
#[command(version)]
#[command(about = "Course registration server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:1337)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Course catalog file (session<TAB>code<TAB>name per line)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Registration log file, appended to on every registration
    #[arg(long)]
    pub registrations: Option<PathBuf>,

    /// Listen backlog for pending connections
    #[arg(long)]
    pub backlog: Option<i32>,

    /// Commands served per connection (0 = until the client disconnects)
    #[arg(long)]
    pub max_commands: Option<usize>,

    /// Serve connections concurrently instead of one at a time
    #[arg(long)]
    pub concurrent: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    #[serde(default = "default_max_commands")]
    pub max_commands: usize,
    #[serde(default)]
    pub concurrent: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            max_commands: default_max_commands(),
            concurrent: false,
        }
    }
}

/// Data file locations
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
    #[serde(default = "default_registrations")]
    pub registrations: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            registrations: default_registrations(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:1337".to_string()
}

fn default_backlog() -> i32 {
    1
}

fn default_max_commands() -> usize {
    1
}

fn default_catalog() -> PathBuf {
    PathBuf::from("cours.txt")
}

fn default_registrations() -> PathBuf {
    PathBuf::from("inscription.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub backlog: i32,
    pub max_commands: usize,
    pub concurrent: bool,
    pub catalog: PathBuf,
    pub registrations: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(CliArgs::default(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from process arguments and the optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve configuration from already-parsed CLI arguments.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            max_commands: cli.max_commands.unwrap_or(toml_config.server.max_commands),
            concurrent: cli.concurrent || toml_config.server.concurrent,
            catalog: cli.catalog.unwrap_or(toml_config.store.catalog),
            registrations: cli.registrations.unwrap_or(toml_config.store.registrations),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen, "127.0.0.1:1337");
        assert_eq!(config.backlog, 1);
        assert_eq!(config.max_commands, 1);
        assert!(!config.concurrent);
        assert_eq!(config.catalog, PathBuf::from("cours.txt"));
        assert_eq!(config.registrations, PathBuf::from("inscription.txt"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:4000"
            backlog = 16
            max_commands = 0
            concurrent = true

            [store]
            catalog = "/srv/registrar/cours.txt"
            registrations = "/srv/registrar/inscription.txt"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:4000");
        assert_eq!(config.server.backlog, 16);
        assert_eq!(config.server.max_commands, 0);
        assert!(config.server.concurrent);
        assert_eq!(config.store.catalog, PathBuf::from("/srv/registrar/cours.txt"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("[store]\ncatalog = \"other.txt\"\n").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:1337");
        assert_eq!(config.store.catalog, PathBuf::from("other.txt"));
        assert_eq!(config.store.registrations, PathBuf::from("inscription.txt"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten = \"0.0.0.0:4000\"\nmax_commands = 5").unwrap();

        let cli = CliArgs::try_parse_from([
            "registrar-server",
            "--config",
            file.path().to_str().unwrap(),
            "--listen",
            "127.0.0.1:9000",
            "--log-level",
            "trace",
        ])
        .unwrap();

        let config = Config::from_args(cli).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.max_commands, 5);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs {
            config: Some(PathBuf::from("/nonexistent/registrar.toml")),
            ..Default::default()
        };
        assert!(matches!(
            Config::from_args(cli),
            Err(ConfigError::FileRead(..))
        ));
    }
}
