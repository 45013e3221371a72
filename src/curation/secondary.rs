//! Merging and cross-validation of a genome's secondary marker copies
//! (typically its 16S SSU rRNA genes).

use crate::core::kmers::{KmerSet, KmerSize};
use crate::core::sequence::Sequence;
use crate::core::types::QualityRating;

/// Outcome of validating the secondary marker copies of one genome
#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryVerdict {
    /// Several copies agree within tolerance; rated by the merged length
    Agreed {
        sequence: String,
        rating: QualityRating,
    },
    /// Exactly one usable copy, so nothing to cross-check
    Single { sequence: String },
    /// Usable copies that disagree with each other
    Disagreed { sequence: String },
    /// No copy reaches the minimum usable length
    TooShort { sequence: String },
}

impl SecondaryVerdict {
    /// The merged sequence stored on the candidate
    #[must_use]
    pub fn sequence(&self) -> &str {
        match self {
            Self::Agreed { sequence, .. }
            | Self::Single { sequence }
            | Self::Disagreed { sequence }
            | Self::TooShort { sequence } => sequence,
        }
    }
}

/// Length and agreement rules for secondary marker sequences
#[derive(Debug, Clone, Copy)]
pub struct SecondaryValidator {
    pub kmer_size: KmerSize,
    /// Maximum kmer distance between copies that still agree
    pub tolerance: f64,
    /// Copies shorter than this are unusable
    pub min_length: usize,
    /// Merged sequences at least this long rate `normal`, shorter ones `short-ssu`
    pub good_length: usize,
}

impl SecondaryValidator {
    /// Rating for an accepted sequence of `len` residues
    #[must_use]
    pub fn rate_length(&self, len: usize) -> QualityRating {
        if len >= self.good_length {
            QualityRating::Normal
        } else {
            QualityRating::ShortSsu
        }
    }

    /// Merge the copies of one genome and decide how far they can be trusted.
    ///
    /// The longest usable copy is the merged sequence (ties go to the
    /// lexically smaller one). Returns `None` when `copies` is empty.
    #[must_use]
    pub fn validate(&self, copies: &[String]) -> Option<SecondaryVerdict> {
        let longest = pick_longest(copies.iter())?;

        let usable: Vec<&String> = copies
            .iter()
            .filter(|s| s.len() >= self.min_length)
            .collect();
        let Some(merged) = pick_longest(usable.iter().copied()) else {
            return Some(SecondaryVerdict::TooShort {
                sequence: longest.clone(),
            });
        };

        if usable.len() == 1 {
            return Some(SecondaryVerdict::Single {
                sequence: merged.clone(),
            });
        }

        let reference = KmerSet::build(Sequence::new("merged", "", merged.as_str()), self.kmer_size);
        let agree = usable.iter().all(|copy| {
            let kmers = KmerSet::build(Sequence::new("copy", "", copy.as_str()), self.kmer_size);
            reference.distance(&kmers) < self.tolerance
        });

        if agree {
            Some(SecondaryVerdict::Agreed {
                sequence: merged.clone(),
                rating: self.rate_length(merged.len()),
            })
        } else {
            Some(SecondaryVerdict::Disagreed {
                sequence: merged.clone(),
            })
        }
    }
}

fn pick_longest<'a>(copies: impl Iterator<Item = &'a String>) -> Option<&'a String> {
    copies.min_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
}
