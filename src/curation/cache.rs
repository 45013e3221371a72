//! Deduplicating batch cache keyed by sequence content hash.
//!
//! Many genomes can reference the same sequence. Owners are grouped by hash so
//! each distinct hash is fetched once per batch, and the resolved sequence is
//! fanned out to every owner.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::core::types::GenomeId;
use crate::curation::provider::{ProviderError, SequenceProvider};

/// Pending hash -> owners map with a bounded number of distinct hashes
#[derive(Debug, Clone)]
pub struct HashBatchCache {
    capacity: usize,
    pending: BTreeMap<String, BTreeSet<GenomeId>>,
}

/// One fetched sequence and every genome that referenced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub hash: String,
    /// Distinct owners, sorted by id
    pub owners: Vec<GenomeId>,
    pub sequence: String,
}

/// Sequences resolved by one flush, with the owners of each
#[derive(Debug, Clone, Default)]
pub struct ResolvedBatch {
    pub resolved: Vec<Resolved>,
    /// Hashes the provider had no sequence for
    pub missing: Vec<String>,
}

impl HashBatchCache {
    /// Create a cache that asks for a flush once `capacity` distinct hashes are pending
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pending: BTreeMap::new(),
        }
    }

    /// A cache that never fills; flushed once explicitly
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Register `owner` as needing the sequence with `hash`.
    /// Returns true when the batch is full and should be flushed.
    pub fn add(&mut self, hash: &str, owner: &GenomeId) -> bool {
        let owners = self.pending.entry(hash.to_string()).or_default();
        if !owners.contains(owner) {
            owners.insert(owner.clone());
        }
        self.is_full()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of distinct hashes waiting to be fetched
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Hashes still waiting to be fetched, in sorted order
    pub fn pending_hashes(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    /// Fetch every pending hash in one provider call and hand back the
    /// sequences grouped with their owners.
    ///
    /// The pending map is cleared only after the fetch succeeds, so a failed
    /// flush can be retried without losing owners.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    pub fn flush<P: SequenceProvider + ?Sized>(
        &mut self,
        provider: &P,
    ) -> Result<ResolvedBatch, ProviderError> {
        if self.pending.is_empty() {
            return Ok(ResolvedBatch::default());
        }

        let hashes: Vec<String> = self.pending.keys().cloned().collect();
        let mut sequences: HashMap<String, String> = provider.sequences(&hashes)?;
        debug!(
            requested = hashes.len(),
            received = sequences.len(),
            "flushed sequence batch"
        );

        let mut batch = ResolvedBatch::default();
        for (hash, owners) in std::mem::take(&mut self.pending) {
            match sequences.remove(&hash) {
                Some(sequence) => batch.resolved.push(Resolved {
                    hash,
                    owners: owners.into_iter().collect(),
                    sequence,
                }),
                None => batch.missing.push(hash),
            }
        }
        Ok(batch)
    }
}
