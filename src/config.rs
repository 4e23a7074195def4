// Configuration management for egress-resolver
// Supports CLI arguments, config file (TOML), and environment variables

use crate::egress::Backend;
use crate::error::ResolverError;
use crate::interface::NetworkInterface;
use crate::probe::DEFAULT_PROBE_PORT;
use crate::routes::parser::DEFAULT_ROUTE_TABLE_PATH;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::Level;

/// egress-resolver - find the local interface the OS would use to reach a target
#[derive(Parser, Debug, Clone)]
#[command(name = "egress-resolver")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, env = "EGRESS_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Path to configuration file
    #[arg(short, long, env = "EGRESS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Egress backend
    #[arg(long, value_enum, env = "EGRESS_BACKEND", global = true)]
    pub backend: Option<Backend>,

    /// Textual route table to read
    #[arg(long, env = "EGRESS_ROUTE_TABLE", global = true)]
    pub route_table: Option<PathBuf>,

    /// Port used for the socket probe
    #[arg(long, env = "EGRESS_PROBE_PORT", global = true)]
    pub probe_port: Option<u16>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve the local interface used to reach TARGET
    Resolve {
        target: Ipv4Addr,

        /// Known local interface (a.b.c.d/len), repeatable
        #[arg(short, long = "interface")]
        interfaces: Vec<NetworkInterface>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the usable IPv4 route table as JSON
    Routes,
}

/// Configuration file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Known local interfaces
    #[serde(default)]
    pub interfaces: Vec<NetworkInterface>,

    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    #[serde(default = "default_route_table_path")]
    pub route_table_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_probe_port() -> u16 {
    DEFAULT_PROBE_PORT
}
fn default_route_table_path() -> PathBuf {
    PathBuf::from(DEFAULT_ROUTE_TABLE_PATH)
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            interfaces: Vec::new(),
            backend: Backend::default(),
            probe_port: default_probe_port(),
            route_table_path: default_route_table_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

/// Merged configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub command: Command,
    pub interfaces: Vec<NetworkInterface>,
    pub backend: Backend,
    pub probe_port: u16,
    pub route_table_path: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Load configuration from all sources (CLI args, config file, defaults)
    /// Priority: CLI args > Environment variables > Config file > Defaults
    pub fn load() -> anyhow::Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli_args: CliArgs) -> anyhow::Result<Self> {
        let config_file = match &cli_args.config {
            Some(path) => read_config_file(path)?,
            None => {
                // Try loading from default locations
                let default_paths = [
                    PathBuf::from("egress-resolver.toml"),
                    PathBuf::from("config.toml"),
                ];

                match default_paths.iter().find(|p| p.exists()) {
                    Some(path) => read_config_file(path)?,
                    None => ConfigFile::default(),
                }
            }
        };

        Self::merge(cli_args, config_file)
    }

    fn merge(cli_args: CliArgs, config_file: ConfigFile) -> anyhow::Result<Self> {
        let log_level = parse_log_level(
            cli_args
                .log_level
                .as_deref()
                .unwrap_or(&config_file.logging.level),
        )?;

        // Interfaces given on the command line replace the configured ones
        let interfaces = match &cli_args.command {
            Command::Resolve { interfaces, .. } if !interfaces.is_empty() => interfaces.clone(),
            _ => config_file.resolver.interfaces,
        };

        Ok(Config {
            command: cli_args.command,
            interfaces,
            backend: cli_args.backend.unwrap_or(config_file.resolver.backend),
            probe_port: cli_args.probe_port.unwrap_or(config_file.resolver.probe_port),
            route_table_path: cli_args
                .route_table
                .unwrap_or(config_file.resolver.route_table_path),
            log_level,
        })
    }
}

fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    tracing::info!("Loading configuration from: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<ConfigFile>(&content)
        .map_err(|e| ResolverError::Config(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

fn parse_log_level(level_str: &str) -> anyhow::Result<Level> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(ResolverError::Config(format!("Invalid log level: {}", level_str)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert!(config.resolver.interfaces.is_empty());
        assert_eq!(config.resolver.backend, Backend::Auto);
        assert_eq!(config.resolver.probe_port, 1);
        assert_eq!(config.resolver.route_table_path, PathBuf::from("/proc/net/route"));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("DEBUG"), Ok(Level::DEBUG)));
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_config_file_parse() {
        let config: ConfigFile = toml::from_str(
            r#"
            [resolver]
            interfaces = ["192.168.1.5/24", "10.8.0.2/32"]
            backend = "probe"
            probe_port = 53

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.resolver.interfaces.len(), 2);
        assert_eq!(config.resolver.interfaces[1].prefix_len(), 32);
        assert_eq!(config.resolver.backend, Backend::Probe);
        assert_eq!(config.resolver.probe_port, 53);
        assert_eq!(config.resolver.route_table_path, PathBuf::from("/proc/net/route"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_file_rejects_bad_interface() {
        let result = toml::from_str::<ConfigFile>("[resolver]\ninterfaces = [\"10.0.0.0/40\"]");
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigFile {
            resolver: ResolverConfig {
                interfaces: vec!["192.168.1.5/24".parse().unwrap()],
                backend: Backend::Probe,
                ..ResolverConfig::default()
            },
            logging: LoggingConfig::default(),
        };

        let cli = args(&[
            "egress-resolver",
            "--backend",
            "route-table",
            "-l",
            "info",
            "resolve",
            "8.8.8.8",
            "-i",
            "10.0.0.2/16",
        ]);
        let config = Config::merge(cli, file.clone()).unwrap();
        assert_eq!(config.backend, Backend::RouteTable);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(
            config.interfaces,
            vec!["10.0.0.2/16".parse::<NetworkInterface>().unwrap()]
        );

        let cli = args(&["egress-resolver", "resolve", "8.8.8.8"]);
        let config = Config::merge(cli, file).unwrap();
        assert_eq!(config.backend, Backend::Probe);
        assert_eq!(config.log_level, Level::WARN);
        assert_eq!(config.interfaces.len(), 1);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[resolver]\nroute_table_path = \"/tmp/route\"").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = args(&["egress-resolver", "--config", &path, "routes"]);
        let config = Config::from_args(cli).unwrap();
        assert_eq!(config.route_table_path, PathBuf::from("/tmp/route"));
        assert!(matches!(config.command, Command::Routes));
    }

    #[test]
    fn test_rejects_bad_target() {
        assert!(CliArgs::try_parse_from(["egress-resolver", "resolve", "not-an-ip"]).is_err());
    }
}
