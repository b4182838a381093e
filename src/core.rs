//! Core domain types and service traits for squatwatch
//!
//! This module defines the value that travels through the pipeline and the
//! trait contract the delivery stage uses to reach notification sinks.

use crate::notification::NotifyError;
use async_trait::async_trait;
use std::fmt;

/// Extra columns between the padded domain and the match annotation.
pub const PADDING_MARGIN: usize = 5;

/// Default minimum width of the domain column.
pub const DEFAULT_MIN_PADDING: usize = 60;

/// A single report: `domain` matched `pattern` for the first time.
///
/// Created by the matcher, moved through the match queue, consumed by the
/// delivery worker. Never modified after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLine {
    domain: String,
    pattern: String,
    width: usize,
}

impl MatchLine {
    /// Creates a line whose domain column is `width + PADDING_MARGIN` wide.
    pub fn new(domain: impl Into<String>, pattern: impl Into<String>, width: usize) -> Self {
        Self {
            domain: domain.into(),
            pattern: pattern.into(),
            width,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for MatchLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<width$} Match -> {}",
            self.domain,
            self.pattern,
            width = self.width + PADDING_MARGIN
        )
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Forwards match lines to an external notification service
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A short, descriptive name for the sink (e.g., "discord", "slack").
    /// Used for logging.
    fn name(&self) -> &str;

    /// Delivers a single line
    ///
    /// # Returns
    /// * `Ok(())` if the sink acknowledged the line with its success status
    /// * `Err` for transport failures and unexpected status codes
    async fn notify(&self, line: &MatchLine) -> Result<(), NotifyError>;
}
