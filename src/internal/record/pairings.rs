//! The pairings database: for every symbol, the branch most likely to
//! share its source revision across the whole repository.
//!
//! The write side tallies co-occurrence scores during an early pass over
//! all files; the read side loads the resulting list for the
//! openings/closings logger. Tie-breaking is deterministic: higher score
//! first, then the order in which candidates were first seen.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::errors::CvsError;

/// Score accumulator for the pairings list.
#[derive(Debug, Clone, Default)]
pub struct PairingsWriter {
    scores: IndexMap<String, IndexMap<String, u32>>,
}

impl PairingsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation: at some revision on `current_branch` (if
    /// any), the symbols in `branches` and `tags` all sprout. Every symbol
    /// scores a point for the current branch and for each other branch
    /// seen alongside it.
    pub fn observe(&mut self, current_branch: Option<&str>, branches: &[&str], tags: &[&str]) {
        for &symbol in branches.iter().chain(tags.iter()) {
            if let Some(branch) = current_branch {
                self.tally(symbol, branch);
            }
            for &branch in branches {
                if branch != symbol {
                    self.tally(symbol, branch);
                }
            }
        }
    }

    fn tally(&mut self, symbol: &str, branch: &str) {
        *self
            .scores
            .entry(symbol.to_string())
            .or_default()
            .entry(branch.to_string())
            .or_insert(0) += 1;
    }

    /// Best-scoring branch for one symbol, if any was observed.
    pub fn best_branch(&self, symbol: &str) -> Option<&str> {
        let scores = self.scores.get(symbol)?;
        let mut best: Option<(&str, u32)> = None;
        for (branch, &count) in scores {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((branch, count));
            }
        }
        best.map(|(branch, _)| branch)
    }

    /// Write the pairings list: one `"{symbol} {branch}"` line per symbol
    /// with a non-empty score map.
    pub fn write(&self, path: &Path) -> Result<(), CvsError> {
        let mut out = BufWriter::new(fs::File::create(path)?);
        for symbol in self.scores.keys() {
            if let Some(branch) = self.best_branch(symbol) {
                writeln!(out, "{symbol} {branch}")?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// The loaded pairings list.
#[derive(Debug, Clone, Default)]
pub struct PairingsDatabase {
    tags: AHashMap<String, String>,
}

impl PairingsDatabase {
    /// An empty database, for conversions run without a pairings pass.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn read(path: &Path) -> Result<Self, CvsError> {
        let mut tags = AHashMap::new();
        for line in fs::read_to_string(path)?.lines() {
            if line.is_empty() {
                continue;
            }
            let (symbol, branch) = line
                .split_once(' ')
                .ok_or_else(|| CvsError::InvalidPairingsLine(line.to_string()))?;
            tags.insert(symbol.to_string(), branch.to_string());
        }
        Ok(Self { tags })
    }

    pub fn best_branch(&self, symbol: &str) -> Option<&str> {
        self.tags.get(symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
