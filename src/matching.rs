//! Pattern matching engine for domain detection
//!
//! Every pattern is anchored at the start of its input and tested against
//! each label of a domain as well as the whole domain. A `RegexSet` lets a
//! single pass report all matching patterns, which matters when a few seed
//! words expand into thousands of mutations.

use crate::core::MatchLine;
use crate::error::ConfigError;
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

const SET_SIZE_LIMIT: usize = 64 * (1 << 20);

/// A compiled, case-insensitive pattern together with the text it came from.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    anchored: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles `source` as a regular expression.
    pub fn new(source: &str) -> Result<Self, ConfigError> {
        Self::compile(source.to_string(), source)
    }

    /// Compiles `word` so that it only matches itself, metacharacters included.
    pub fn literal(word: &str) -> Result<Self, ConfigError> {
        Self::compile(word.to_string(), &regex::escape(word))
    }

    fn compile(source: String, expr: &str) -> Result<Self, ConfigError> {
        let anchored = format!("^(?:{expr})");
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: source.clone(),
                source: e,
            })?;
        Ok(Self {
            source,
            anchored,
            regex,
        })
    }

    /// The pattern as it was written; this is what match reports show.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if the pattern matches at the start of `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Loads patterns from a file, one regular expression per line.
///
/// Lines are trimmed. Empty lines and lines starting with `#` are skipped.
pub async fn load_patterns_from_file<P: AsRef<Path>>(
    file_path: P,
) -> Result<Vec<Pattern>, ConfigError> {
    let path = file_path.as_ref();
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::PatternFile {
            path: path.to_path_buf(),
            source,
        })?;

    let mut patterns = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        patterns.push(Pattern::new(line)?);
    }

    info!(path = %path.display(), count = patterns.len(), "Loaded patterns from file");
    Ok(patterns)
}

/// Turns generated mutations into lower-cased literal patterns, one per
/// distinct mutation. The empty string is dropped since it would match every
/// domain.
pub fn patterns_from_mutations(mutations: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    let mut seen = HashSet::new();
    mutations
        .iter()
        .map(|m| m.to_lowercase())
        .filter(|m| !m.is_empty() && seen.insert(m.clone()))
        .map(|m| Pattern::literal(&m))
        .collect()
}

/// Matches domains against the pattern set and remembers what it reported.
///
/// Owned by the stream listener. Nothing else reads or writes the report
/// record, so no locking is needed.
pub struct PatternMatcher {
    patterns: Vec<Pattern>,
    regex_set: RegexSet,
    /// Domain -> pattern sources already reported for it.
    reported: HashMap<String, HashSet<String>>,
    min_padding: usize,
    padding: usize,
}

impl PatternMatcher {
    pub fn new(patterns: Vec<Pattern>, min_padding: usize) -> Result<Self, ConfigError> {
        let regex_set = RegexSetBuilder::new(patterns.iter().map(|p| p.anchored.as_str()))
            .case_insensitive(true)
            .size_limit(SET_SIZE_LIMIT)
            .build()
            .map_err(|source| ConfigError::PatternSet {
                count: patterns.len(),
                source,
            })?;

        Ok(Self {
            patterns,
            regex_set,
            reported: HashMap::new(),
            min_padding,
            padding: min_padding,
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of distinct domains that produced at least one report.
    pub fn reported_domains(&self) -> usize {
        self.reported.len()
    }

    /// Current width of the domain column.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Evaluates one domain, returning a line for every pattern that matches
    /// it for the first time.
    pub fn evaluate(&mut self, domain: &str) -> Vec<MatchLine> {
        self.padding = domain.chars().count().max(self.min_padding);

        let lowered = domain.to_lowercase();
        let mut hits = BTreeSet::new();
        for candidate in lowered.split('.').chain(std::iter::once(lowered.as_str())) {
            hits.extend(self.regex_set.matches(candidate).into_iter());
        }

        let mut lines = Vec::new();
        for index in hits {
            let source = self.patterns[index].source();
            // Matching ignores case, so two sources that differ only in case
            // are one pattern as far as reporting goes.
            let is_new = self
                .reported
                .entry(domain.to_string())
                .or_default()
                .insert(source.to_lowercase());
            if is_new {
                debug!(domain, pattern = source, "New match");
                lines.push(MatchLine::new(domain, source, self.padding));
            }
        }

        self.padding = self.min_padding;
        lines
    }
}
