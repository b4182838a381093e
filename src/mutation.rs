//! Look-alike domain generation.
//!
//! Expands a seed word into the set of strings a squatter is likely to
//! register: homoglyph and leet substitutions, single-edit typos, and the
//! seed glued to common marketing words.

use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// Substitution table, applied in this order. Each entry sees the strings
/// produced by the entries before it.
const SUBSTITUTIONS: &[(char, &[&str])] = &[
    ('a', &["4", "@"]),
    ('e', &["3"]),
    ('i', &["1", "l"]),
    ('o', &["0"]),
    ('s', &["5", "$"]),
    ('t', &["7"]),
    ('b', &["8"]),
    ('l', &["1", "I"]),
    ('g', &["9"]),
    ('m', &["n", "nn", "rn"]),
    ('n', &["m", "nn", "ri"]),
    ('d', &["cl"]),
    ('u', &["v"]),
    ('r', &["p"]),
    ('c', &["e"]),
];

const COMBO_WORDS: &[&str] = &[
    "sale", "buy", "shop", "online", "official", "store", "airdrop", "mint",
];

/// Returns an error unless `word` only contains ASCII letters, digits and `-`.
pub fn validate_seed(word: &str) -> Result<(), ConfigError> {
    if word.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        Ok(())
    } else {
        Err(ConfigError::InvalidSeed(word.to_string()))
    }
}

/// Generates every mutation of `seed`, the seed itself included.
///
/// The result is ordered lexicographically so that two runs over the same
/// seed produce identical output.
pub fn generate(seed: &str) -> BTreeSet<String> {
    let mut mutations = BTreeSet::new();
    mutations.insert(seed.to_string());

    for (ch, replacements) in SUBSTITUTIONS {
        let snapshot: Vec<String> = mutations.iter().cloned().collect();
        for word in snapshot.iter().filter(|w| w.contains(*ch)) {
            for replacement in replacements.iter() {
                mutations.insert(word.replace(*ch, replacement));
            }
        }
    }

    add_typos(seed, &mut mutations);

    for combo in COMBO_WORDS {
        mutations.insert(format!("{seed}{combo}"));
        mutations.insert(format!("{combo}{seed}"));
    }

    debug!(seed, count = mutations.len(), "Generated mutations");
    mutations
}

/// Deletions, replacements, insertions and adjacent swaps of the seed.
fn add_typos(seed: &str, mutations: &mut BTreeSet<String>) {
    let chars: Vec<char> = seed.chars().collect();

    for i in 0..chars.len() {
        let head: String = chars[..i].iter().collect();
        let from_i: String = chars[i..].iter().collect();
        let after_i: String = chars[i + 1..].iter().collect();

        mutations.insert(format!("{head}{after_i}"));

        for letter in 'a'..='z' {
            mutations.insert(format!("{head}{letter}{after_i}"));
            mutations.insert(format!("{head}{letter}{from_i}"));
        }

        if i + 1 < chars.len() {
            let rest: String = chars[i + 2..].iter().collect();
            mutations.insert(format!("{head}{}{}{rest}", chars[i + 1], chars[i]));
        }
    }
}

/// Somewhere to keep the generated mutations once startup is done.
pub trait MutationStore: Send + Sync {
    fn persist(&self, seed: &str, mutations: &BTreeSet<String>) -> Result<(), ConfigError>;
}

/// Writes each seed's mutations to `<dir>/<seed>_mutations.txt`, one per line.
#[derive(Debug, Clone)]
pub struct FileMutationStore {
    dir: PathBuf,
}

impl FileMutationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, seed: &str) -> PathBuf {
        self.dir.join(format!("{seed}_mutations.txt"))
    }
}

impl MutationStore for FileMutationStore {
    fn persist(&self, seed: &str, mutations: &BTreeSet<String>) -> Result<(), ConfigError> {
        let path = self.path_for(seed);
        let mut contents = String::new();
        for mutation in mutations {
            contents.push_str(mutation);
            contents.push('\n');
        }
        std::fs::write(&path, contents).map_err(|source| ConfigError::MutationStore {
            path: path.clone(),
            source,
        })?;
        info!(seed, path = %path.display(), count = mutations.len(), "Wrote mutations");
        Ok(())
    }
}

/// A store that keeps nothing, for when persisting is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMutationStore;

impl MutationStore for NullMutationStore {
    fn persist(&self, _seed: &str, _mutations: &BTreeSet<String>) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Validates, expands and persists every seed, returning the combined list.
///
/// Seeds are processed in the order given. The combined list is lower-cased
/// since matching ignores case; a mutation produced twice (by two seeds, or
/// in two cases such as `paypaI` and `paypai`) is only listed once, at its
/// first position. Persisted files keep the generated spelling.
pub fn mutate_all<S: AsRef<str>>(
    seeds: &[S],
    store: &dyn MutationStore,
) -> Result<Vec<String>, ConfigError> {
    for seed in seeds {
        validate_seed(seed.as_ref())?;
    }

    let mut seen = BTreeSet::new();
    let mut all = Vec::new();
    for seed in seeds {
        let seed = seed.as_ref();
        let mutations = generate(seed);
        store.persist(seed, &mutations)?;
        for mutation in mutations {
            let folded = mutation.to_lowercase();
            if seen.insert(folded.clone()) {
                all.push(folded);
            }
        }
    }
    Ok(all)
}
