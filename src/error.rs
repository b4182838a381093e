//! Error types for the fatal startup path.
//!
//! Everything in here aborts startup before any task is spawned. Runtime
//! failures (stream disconnects, webhook errors) are logged where they happen
//! and never surface as a `ConfigError`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no input patterns or word to mutate provided")]
    MissingPatternSource,

    #[error("a pattern file and mutation words are mutually exclusive")]
    ConflictingPatternSources,

    #[error("cannot read pattern file {path:?}: {source}")]
    PatternFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to compile {count} patterns into a set: {source}")]
    PatternSet {
        count: usize,
        #[source]
        source: regex::Error,
    },

    #[error("invalid characters in word: {0}")]
    InvalidSeed(String),

    #[error("cannot write to file {path:?}: {source}")]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot persist mutations to {path:?}: {source}")]
    MutationStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("webhook_timeout_seconds must be greater than zero")]
    ZeroWebhookTimeout,

    #[error("configuration file {0:?} does not exist")]
    MissingConfigFile(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}
