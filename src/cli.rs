//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. Flags that are given override the TOML configuration file and
//! environment variables; flags that are absent leave them untouched.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::{Path, PathBuf};

/// Monitor certstream for newly issued certificates whose domains match your
/// patterns or look like your brand.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File with patterns to monitor, one regular expression per line.
    #[arg(short, long, value_name = "FILE", conflicts_with = "mutate")]
    pub file: Option<PathBuf>,

    /// Generate and use mutations of these words instead of a patterns file.
    #[arg(short, long, value_name = "WORD", num_args = 1..)]
    pub mutate: Vec<String>,

    /// File to write matched domains to.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Discord webhook URL. May be given more than once.
    #[arg(long = "discord-webhook", value_name = "URL")]
    pub discord_webhooks: Vec<String>,

    /// Slack webhook URL. May be given more than once.
    #[arg(long = "slack-webhook", value_name = "URL")]
    pub slack_webhooks: Vec<String>,

    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (e.g. "info", "debug", "squatwatch=trace").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// WebSocket URL of the certstream server.
    #[arg(long, value_name = "URL")]
    pub certstream_url: Option<String>,
}

fn path_value(path: &Path) -> Value {
    Value::from(path.to_string_lossy().into_owned())
}

fn insert_section(dict: &mut Dict, name: &str, section: Dict) {
    if !section.is_empty() {
        dict.insert(name.into(), Value::Dict(Tag::Default, section));
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();
        let mut network = Dict::new();
        let mut matching = Dict::new();
        let mut output = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }
        if let Some(url) = &self.certstream_url {
            network.insert("certstream_url".into(), Value::from(url.clone()));
        }
        if let Some(file) = &self.file {
            matching.insert("pattern_file".into(), path_value(file));
        }
        if !self.mutate.is_empty() {
            matching.insert("mutate".into(), Value::from(self.mutate.clone()));
        }
        if let Some(path) = &self.output {
            output.insert("path".into(), path_value(path));
        }
        // Webhooks given on the command line replace, not extend, configured ones.
        if !self.discord_webhooks.is_empty() {
            output.insert(
                "discord_webhooks".into(),
                Value::from(self.discord_webhooks.clone()),
            );
        }
        if !self.slack_webhooks.is_empty() {
            output.insert(
                "slack_webhooks".into(),
                Value::from(self.slack_webhooks.clone()),
            );
        }

        insert_section(&mut dict, "network", network);
        insert_section(&mut dict, "matching", matching);
        insert_section(&mut dict, "output", output);

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
