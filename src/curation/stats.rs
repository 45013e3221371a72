use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named counters accumulated during a curation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistics {
    counters: BTreeMap<String, u64>,
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `key`
    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    /// Add `n` to `key`
    pub fn add(&mut self, key: &str, n: u64) {
        *self.counters.entry(key.to_string()).or_default() += n;
    }

    /// Current value of `key` (0 if never counted)
    #[must_use]
    pub fn get(&self, key: &str) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// Counters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(k, &v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Fold another set of counters into this one
    pub fn merge(&mut self, other: &Statistics) {
        for (key, n) in other.iter() {
            self.add(key, n);
        }
    }

    /// Export to JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One `counter<TAB>count` line per counter
impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, n) in self.iter() {
            writeln!(f, "{key}\t{n}")?;
        }
        Ok(())
    }
}
