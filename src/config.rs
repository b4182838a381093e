//! Configuration management for squatwatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer defaults, an optional TOML file, `SQUATWATCH_` environment
//! variables and finally the command line.

use crate::cli::Cli;
use crate::core::DEFAULT_MIN_PADDING;
use crate::error::ConfigError;
use crate::mutation::validate_seed;
use crate::network::DEFAULT_RECONNECT_DELAY;
use crate::sink::DEFAULT_CAPACITY;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the certstream client.
    pub network: NetworkConfig,
    /// Configuration for pattern matching.
    pub matching: MatchingConfig,
    /// Configuration for output and notifications.
    pub output: OutputConfig,
}

/// Configuration for the certstream client.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// The URL of the certstream WebSocket server.
    pub certstream_url: String,
    /// Seconds to wait after a disconnect before reconnecting.
    pub reconnect_delay_seconds: u64,
}

/// Configuration for pattern matching.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// File with one regular expression per line.
    pub pattern_file: Option<PathBuf>,
    /// Seed words whose mutations are used instead of a pattern file.
    pub mutate: Vec<String>,
    /// Minimum width of the domain column in match lines.
    pub min_padding: usize,
    /// Where `<seed>_mutations.txt` files are written.
    pub mutations_dir: PathBuf,
    /// Whether generated mutations are written out at all.
    pub persist_mutations: bool,
}

/// Configuration for output and notifications.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// File every match line is appended to. Truncated at startup.
    pub path: PathBuf,
    /// Capacity of the queue between matching and delivery.
    pub queue_capacity: usize,
    /// Print match lines to stdout as well.
    pub echo_stdout: bool,
    /// Discord incoming webhook URLs.
    pub discord_webhooks: Vec<String>,
    /// Slack incoming webhook URLs.
    pub slack_webhooks: Vec<String>,
    /// Timeout for a single webhook request.
    pub webhook_timeout_seconds: u64,
}

/// Where the pattern set comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    File(PathBuf),
    Mutate(Vec<String>),
}

impl MatchingConfig {
    /// Resolves the configured pattern source, rejecting a missing or
    /// ambiguous one and any seed with characters outside `[A-Za-z0-9-]`.
    pub fn source(&self) -> Result<PatternSource, ConfigError> {
        match (&self.pattern_file, self.mutate.is_empty()) {
            (Some(_), false) => Err(ConfigError::ConflictingPatternSources),
            (Some(path), true) => Ok(PatternSource::File(path.clone())),
            (None, false) => {
                for word in &self.mutate {
                    validate_seed(word)?;
                }
                Ok(PatternSource::Mutate(self.mutate.clone()))
            }
            (None, true) => Err(ConfigError::MissingPatternSource),
        }
    }
}

impl NetworkConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_seconds)
    }
}

impl OutputConfig {
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_seconds)
    }
}

impl Config {
    /// Loads the application configuration, layering defaults, the optional
    /// TOML file named on the command line, environment variables (e.g.
    /// `SQUATWATCH_OUTPUT__PATH=out.txt`) and the command-line flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            if !path.is_file() {
                return Err(ConfigError::MissingConfigFile(path.clone()));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("SQUATWATCH_").split("__"))
            .merge(cli.clone())
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Checks everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<PatternSource, ConfigError> {
        if self.output.webhook_timeout_seconds == 0 {
            return Err(ConfigError::ZeroWebhookTimeout);
        }
        self.matching.source()
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            network: NetworkConfig::default(),
            matching: MatchingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            certstream_url: "wss://certstream.calidog.io/".to_string(),
            reconnect_delay_seconds: DEFAULT_RECONNECT_DELAY.as_secs(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            pattern_file: None,
            mutate: vec![],
            min_padding: DEFAULT_MIN_PADDING,
            mutations_dir: PathBuf::from("."),
            persist_mutations: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("matches.txt"),
            queue_capacity: DEFAULT_CAPACITY,
            echo_stdout: true,
            discord_webhooks: vec![],
            slack_webhooks: vec![],
            webhook_timeout_seconds: 10,
        }
    }
}
