// File: sample_set.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// An observed token value and its position in observation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub value: String,
    pub index: usize,
}

/// `position -> character -> occurrences` over every recorded token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    positions: Vec<HashMap<char, usize>>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_token(&mut self, value: &str) {
        for (pos, ch) in value.chars().enumerate() {
            if pos == self.positions.len() {
                self.positions.push(HashMap::new());
            }
            *self.positions[pos].entry(ch).or_insert(0) += 1;
        }
    }

    pub fn positions(&self) -> usize {
        self.positions.len()
    }

    pub fn counts_at(&self, position: usize) -> Option<&HashMap<char, usize>> {
        self.positions.get(position)
    }

    pub fn count(&self, position: usize, ch: char) -> usize {
        self.positions
            .get(position)
            .and_then(|counts| counts.get(&ch))
            .copied()
            .unwrap_or(0)
    }

    /// Number of tokens long enough to have a character at `position`.
    pub fn total_at(&self, position: usize) -> usize {
        self.positions
            .get(position)
            .map_or(0, |counts| counts.values().sum())
    }

    pub fn alphabet(&self) -> BTreeSet<char> {
        self.positions
            .iter()
            .flat_map(|counts| counts.keys().copied())
            .collect()
    }
}

#[derive(Debug, Default)]
struct Samples {
    tokens: Vec<Token>,
    frequencies: FrequencyTable,
}

/// Tokens and frequency table taken under one read lock.
#[derive(Debug, Clone, Default)]
pub struct SampleSnapshot {
    pub tokens: Vec<Token>,
    pub frequencies: FrequencyTable,
}

/// Append-only store shared by every worker of a run.
#[derive(Debug, Default)]
pub struct SampleSet {
    inner: RwLock<Samples>,
    len: AtomicUsize,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` and updates the frequency table in one step.
    /// Returns the sequence index assigned to the token.
    pub fn append(&self, value: impl Into<String>) -> usize {
        let value = value.into();
        let mut samples = self.inner.write();
        let index = samples.tokens.len();
        samples.frequencies.add_token(&value);
        samples.tokens.push(Token { value, index });
        self.len.store(index + 1, Ordering::Release);
        index
    }

    /// Lock-free count, suitable for progress polling.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Token> {
        self.inner.read().tokens.clone()
    }

    pub fn frequencies(&self) -> FrequencyTable {
        self.inner.read().frequencies.clone()
    }

    pub fn snapshot_with_frequencies(&self) -> SampleSnapshot {
        let samples = self.inner.read();
        SampleSnapshot {
            tokens: samples.tokens.clone(),
            frequencies: samples.frequencies.clone(),
        }
    }
}
