//! squatwatch - certificate transparency monitor for look-alike domains
//!
//! This library watches the certstream feed, matches every certificate domain
//! against user patterns or generated mutations of a brand word, and writes
//! each new match to a file, stdout and optional webhooks.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod delivery;
pub mod error;
pub mod matching;
pub mod mutation;
pub mod network;
pub mod notification;
pub mod sink;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
pub use error::ConfigError;
