//! JSON-file persistence for the alert rule document.
//!
//! The whole document is rewritten on every save. Writes go to a temp file
//! in the target directory and are renamed into place, so an interrupted
//! write never corrupts the previously saved document.

pub mod error;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tickmon_common::types::{AlertRule, Channel, RuleDocument};

use crate::error::{Result, StoreError};

pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted document. A missing file yields the empty
    /// document; unparsable content does too (with a warning), so a corrupt
    /// file never takes the scan loop down. Rules without an id get one
    /// backfilled before the document is returned.
    pub fn load(&self) -> Result<RuleDocument> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RuleDocument::default());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        let mut doc = match serde_json::from_str::<RuleDocument>(&content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Rule document unparsable, starting from an empty one"
                );
                RuleDocument::default()
            }
        };
        ensure_ids(&mut doc);
        Ok(doc)
    }

    /// Atomically rewrites the whole document. No partial updates: every
    /// pass saves the full `{tickers, scanners}` object.
    pub fn save(&self, doc: &RuleDocument) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let json = serde_json::to_vec_pretty(doc)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(&json)?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Backfills missing rule ids as `{scope}_{channel}{n}`, matching the ids
/// the interactive editor assigns: `scope` is the lowercased symbol for
/// symbol rules and `scanner` for scanner rules, `n` the first free counter
/// within that scope.
fn ensure_ids(doc: &mut RuleDocument) {
    for (symbol, rules) in doc.tickers.iter_mut() {
        backfill_scope(&symbol.to_lowercase(), rules);
    }
    backfill_scope("scanner", &mut doc.scanners);
}

fn backfill_scope(base: &str, rules: &mut [AlertRule]) {
    let mut taken: HashSet<String> = rules
        .iter()
        .filter(|r| !r.id.is_empty())
        .map(|r| r.id.clone())
        .collect();

    for rule in rules.iter_mut().filter(|r| r.id.is_empty()) {
        let id = next_free_id(base, rule.channel, &taken);
        taken.insert(id.clone());
        rule.id = id;
    }
}

fn next_free_id(base: &str, channel: Channel, taken: &HashSet<String>) -> String {
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}_{channel}{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
