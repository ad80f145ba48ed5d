//! Configuration for the coordinator and worker binaries
//!
//! Both binaries are configured from the command line; the coordinator can
//! additionally read listener settings from a YAML or JSON file, with
//! explicit command line values taking precedence.

use crate::partition::total_space;
use crate::protocol::DEFAULT_PORT;
use crate::types::{Charset, MAX_NONCE_LENGTH, MAX_TEXT_LENGTH};
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{}", name)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    Plain,
    /// One JSON object per line
    Json,
}

/// Coordinator configuration
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "pow-coordinator",
    version = env!("CARGO_PKG_VERSION"),
    about = "Distributed proof-of-work coordinator",
    long_about = "Splits the nonce space between a fixed number of workers and records the first reported solution"
)]
pub struct CoordinatorConfig {
    /// File whose contents the nonce is appended to
    #[arg(value_name = "TEXTFILE")]
    pub text_file: PathBuf,

    /// Number of symbols in every nonce
    #[arg(value_name = "NONCE_LENGTH")]
    pub nonce_length: usize,

    /// Required number of trailing zero decimal digits in the hash
    #[arg(value_name = "DIFFICULTY")]
    pub difficulty: u32,

    /// Number of workers to wait for
    #[arg(value_name = "NUM_WORKERS")]
    pub num_workers: usize,

    /// Listen interface
    #[arg(long, default_value = "0.0.0.0")]
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[arg(short = 'p', long, env = "POW_PORT", default_value_t = DEFAULT_PORT)]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, default_value = "plain")]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Configuration file path (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(skip)]
    pub print_config: bool,
}

/// Listener settings read from a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerFileConfig {
    /// Listen interface
    pub host: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// Log level
    pub log_level: Option<LogLevel>,
}

impl CoordinatorConfig {
    /// Parse the command line, merge the config file and validate
    pub async fn load() -> Result<Self> {
        let mut config = Self::parse();

        if let Some(path) = config.config_file.clone() {
            let file_config = load_file(&path).await?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Take file values for options left at their defaults
    pub fn merge_with_file(mut self, file: ListenerFileConfig) -> Self {
        if let Some(host) = file.host {
            if self.host == default_host() {
                self.host = host;
            }
        }
        if let Some(port) = file.port {
            if self.port == default_port() {
                self.port = port;
            }
        }
        if let Some(level) = file.log_level {
            if self.log_level == default_log_level() {
                self.log_level = level;
            }
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_NONCE_LENGTH).contains(&self.nonce_length) {
            return Err(Error::config(format!(
                "Nonce length must be between 1 and {}",
                MAX_NONCE_LENGTH
            )));
        }

        if self.difficulty > i32::MAX as u32 {
            return Err(Error::config("Difficulty is too large"));
        }

        if self.num_workers == 0 {
            return Err(Error::config("Number of workers must be greater than 0"));
        }

        let space = total_space(self.charset().len(), self.nonce_length)?;
        if space < self.num_workers as u64 {
            return Err(Error::config(format!(
                "{} workers requested but the search space only holds {} nonces",
                self.num_workers, space
            )));
        }

        self.socket_addr()?;
        Ok(())
    }

    /// The nonce character set; fixed to digits and uppercase letters
    pub fn charset(&self) -> Charset {
        Charset::alphanumeric()
    }

    /// Listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| Error::config(format!("Invalid listen interface: {}", e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Worker configuration
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "pow-worker",
    version = env!("CARGO_PKG_VERSION"),
    about = "Distributed proof-of-work worker",
    long_about = "Connects to a coordinator, searches the assigned nonce range and reports the first solution"
)]
pub struct WorkerConfig {
    /// Coordinator IP address
    #[arg(value_name = "SERVER_IP", default_value = "127.0.0.1")]
    #[serde(default = "default_server_ip")]
    pub server_ip: String,

    /// Coordinator port
    #[arg(short = 'p', long, env = "POW_PORT", default_value_t = DEFAULT_PORT)]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, default_value = "plain")]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(skip)]
    pub print_config: bool,
}

impl WorkerConfig {
    /// Parse the command line and validate
    pub fn load() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.coordinator_addr().map(|_| ())
    }

    /// Coordinator address
    pub fn coordinator_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server_ip
            .parse()
            .map_err(|e| Error::config(format!("Invalid server address: {}", e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Read the text file as raw bytes, truncated to [`MAX_TEXT_LENGTH`]
pub async fn load_text(path: &Path) -> Result<Vec<u8>> {
    let mut text = tokio::fs::read(path).await?;

    if text.len() > MAX_TEXT_LENGTH {
        warn!(
            "Text file has {} bytes, only the first {} are used",
            text.len(),
            MAX_TEXT_LENGTH
        );
        text.truncate(MAX_TEXT_LENGTH);
    }

    info!("Loaded {} bytes from {}", text.len(), path.display());
    Ok(text)
}

/// Load a configuration file; `.json` files are JSON, anything else YAML
async fn load_file(path: &Path) -> Result<ListenerFileConfig> {
    let content = tokio::fs::read_to_string(path).await?;

    if path.extension().and_then(|s| s.to_str()) == Some("json") {
        serde_json::from_str(&content).map_err(Error::from)
    } else {
        serde_yaml::from_str(&content).map_err(Error::from)
    }
}

// Default value functions for serde
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_server_ip() -> String { Ipv4Addr::LOCALHOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_log_format() -> LogFormat { LogFormat::Plain }
