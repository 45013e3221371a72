//! K-mer sets and the similarity/distance measures built on them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::core::sequence::Sequence;
use crate::utils::count_to_f64;

/// Default kmer size for protein sequences
pub const DEFAULT_PROTEIN_KMER: usize = 8;

/// Default kmer size for nucleotide sequences
pub const DEFAULT_DNA_KMER: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KmerError {
    #[error("Invalid kmer size {0}: must be at least 1")]
    InvalidSize(usize),
}

/// A validated, positive kmer length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct KmerSize(usize);

impl KmerSize {
    /// # Errors
    ///
    /// Returns `KmerError::InvalidSize` if `k` is zero.
    pub fn new(k: usize) -> Result<Self, KmerError> {
        if k == 0 {
            Err(KmerError::InvalidSize(k))
        } else {
            Ok(Self(k))
        }
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for KmerSize {
    type Error = KmerError;

    fn try_from(k: usize) -> Result<Self, Self::Error> {
        Self::new(k)
    }
}

impl From<KmerSize> for usize {
    fn from(k: KmerSize) -> Self {
        k.0
    }
}

impl std::fmt::Display for KmerSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kmer sizes for both alphabets, fixed for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerConfig {
    pub protein: KmerSize,
    pub dna: KmerSize,
}

impl Default for KmerConfig {
    fn default() -> Self {
        Self {
            protein: KmerSize(DEFAULT_PROTEIN_KMER),
            dna: KmerSize(DEFAULT_DNA_KMER),
        }
    }
}

impl KmerConfig {
    /// # Errors
    ///
    /// Returns `KmerError::InvalidSize` if either size is zero.
    pub fn new(protein: usize, dna: usize) -> Result<Self, KmerError> {
        Ok(Self {
            protein: KmerSize::new(protein)?,
            dna: KmerSize::new(dna)?,
        })
    }
}

/// The distinct overlapping kmers of a sequence.
///
/// Kmers are taken over the uppercased residues, so a sequence of length `L`
/// contributes at most `L - k + 1` kmers. The source sequence is retained so
/// the set can be rebuilt at a different `k`.
#[derive(Debug, Clone)]
pub struct KmerSet {
    sequence: Sequence,
    k: KmerSize,
    kmers: HashSet<String>,
}

impl KmerSet {
    /// Extract every kmer of length `k` from `sequence`
    #[must_use]
    pub fn build(sequence: Sequence, k: KmerSize) -> Self {
        let residues = sequence.residues().to_ascii_uppercase();
        let width = k.get();
        let mut kmers = HashSet::new();
        if residues.len() >= width {
            kmers.reserve(residues.len() - width + 1);
            for start in 0..=residues.len() - width {
                // Non-ASCII input can split a char; such windows are skipped
                if let Some(kmer) = residues.get(start..start + width) {
                    kmers.insert(kmer.to_string());
                }
            }
        }
        Self {
            sequence,
            k,
            kmers,
        }
    }

    /// Build a set directly from kmer strings (for constructing exact overlaps)
    #[cfg(test)]
    pub fn from_kmers<I, S>(label: &str, k: KmerSize, kmers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sequence: Sequence::new(label, "", ""),
            k,
            kmers: kmers.into_iter().map(Into::into).collect(),
        }
    }

    /// Rebuild this set from its retained sequence at another kmer size
    #[must_use]
    pub fn rebuild(&self, k: KmerSize) -> Self {
        Self::build(self.sequence.clone(), k)
    }

    #[must_use]
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    #[must_use]
    pub fn k(&self) -> KmerSize {
        self.k
    }

    /// Number of distinct kmers
    #[must_use]
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, kmer: &str) -> bool {
        self.kmers.contains(kmer)
    }

    /// Number of kmers present in both sets
    #[must_use]
    pub fn similarity(&self, other: &KmerSet) -> usize {
        let (small, large) = if self.kmers.len() <= other.kmers.len() {
            (&self.kmers, &other.kmers)
        } else {
            (&other.kmers, &self.kmers)
        };
        small.iter().filter(|kmer| large.contains(*kmer)).count()
    }

    /// Jaccard distance: `1 - |A ∩ B| / |A ∪ B|`.
    ///
    /// Any pair with no shared kmer has distance 1.0. When both sets are
    /// empty (both sequences shorter than `k`), the sequences themselves are
    /// compared: identical residues give 0.0, anything else 1.0.
    #[must_use]
    pub fn distance(&self, other: &KmerSet) -> f64 {
        self.distance_with_shared(other, self.similarity(other))
    }

    /// Jaccard distance when the number of shared kmers is already known
    #[must_use]
    pub fn distance_with_shared(&self, other: &KmerSet, shared: usize) -> f64 {
        let union = self.len() + other.len() - shared;
        if union == 0 {
            if self
                .sequence
                .residues()
                .eq_ignore_ascii_case(other.sequence.residues())
            {
                0.0
            } else {
                1.0
            }
        } else {
            1.0 - count_to_f64(shared) / count_to_f64(union)
        }
    }
}

impl PartialEq for KmerSet {
    fn eq(&self, other: &Self) -> bool {
        self.k == other.k && self.kmers == other.kmers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kset(residues: &str, k: usize) -> KmerSet {
        KmerSet::build(Sequence::new("s", "", residues), KmerSize::new(k).unwrap())
    }

    #[test]
    fn test_kmer_size_rejects_zero() {
        assert_eq!(KmerSize::new(0), Err(KmerError::InvalidSize(0)));
        assert_eq!(KmerSize::new(8).unwrap().get(), 8);
        assert!(KmerConfig::new(8, 0).is_err());
    }

    #[test]
    fn test_kmer_count_and_dedup() {
        let set = kset("MKVLAAGMKV", 3);
        // 8 windows, "MKV" appears twice
        assert_eq!(set.len(), 7);
        assert!(set.contains("MKV"));
        assert!(set.contains("GMK"));
    }

    #[test]
    fn test_short_sequence_has_no_kmers() {
        assert!(kset("MKV", 4).is_empty());
        assert!(kset("", 1).is_empty());
        assert_eq!(kset("MKVL", 4).len(), 1);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(kset("mkvlaag", 3), kset("MKVLAAG", 3));
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = kset("MKVLAAGIVGLPNVGKSTLFNALT", 4);
        let b = kset("MKVLAAGIVGAPNVGKSTLFNSLT", 4);
        assert_eq!(a.similarity(&b), b.similarity(&a));
        assert!(a.similarity(&b) > 0);
    }

    #[test]
    fn test_distance_identity_and_disjoint() {
        let a = kset("ACDEFGHIKLMNPQRSTVWY", 5);
        let b = kset("WWWWWWWWWWWWWWWWWWWW", 5);
        assert!((a.distance(&a) - 0.0).abs() < f64::EPSILON);
        assert_eq!(a.similarity(&b), 0);
        assert!((a.distance(&b) - 1.0).abs() < f64::EPSILON);
        assert!((b.distance(&a) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distance_partial_overlap() {
        let k = KmerSize::new(2).unwrap();
        let a = KmerSet::from_kmers("a", k, ["AA", "AC", "AD", "AE"]);
        let b = KmerSet::from_kmers("b", k, ["AA", "AC", "XX", "YY"]);
        // 2 shared, union 6
        assert_eq!(a.similarity(&b), 2);
        assert!((a.distance(&b) - (1.0 - 2.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_sequences_shorter_than_k() {
        // No kmers on either side: only identical residues are at distance 0
        let a = kset("MKV", 8);
        let b = kset("WWW", 8);
        assert_eq!(a.similarity(&b), 0);
        assert!((a.distance(&b) - 1.0).abs() < f64::EPSILON);
        assert!((a.distance(&kset("mkv", 8)) - 0.0).abs() < f64::EPSILON);
        assert!((kset("", 3).distance(&kset("", 3)) - 0.0).abs() < f64::EPSILON);
        assert!((kset("", 3).distance(&kset("AC", 3)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rebuild_keeps_sequence() {
        let a = kset("ACGTACGTAC", 4);
        let b = a.rebuild(KmerSize::new(2).unwrap());
        assert_eq!(b.k().get(), 2);
        assert_eq!(b.sequence(), a.sequence());
        assert_eq!(b.len(), 4); // AC, CG, GT, TA
    }
}
