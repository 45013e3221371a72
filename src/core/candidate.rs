use serde::{Deserialize, Serialize};

use crate::core::sequence::Sequence;
use crate::core::taxonomy::Lineage;
use crate::core::types::{Domain, GenomeId, QualityRating, TaxonId};

/// One row of the genome input list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeInput {
    pub id: GenomeId,
    pub name: String,
    /// Taxon ids from root to leaf
    pub lineage: Vec<TaxonId>,
    /// External quality score (higher is better)
    pub score: f64,
    /// Upstream reference/representative flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<QualityRating>,
}

/// A genome being curated.
///
/// Created from a [`GenomeInput`] once its species resolves, then filled in
/// place as each curation phase resolves more fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: GenomeId,
    pub name: String,
    pub score: f64,
    pub domain: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<TaxonId>,
    pub species: TaxonId,
    pub genetic_code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<QualityRating>,

    /// Feature id of the chosen primary marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_dna: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_protein: Option<String>,

    /// Merged secondary marker sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    /// Number of valid secondary-marker sequences found
    #[serde(default)]
    pub secondary_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<QualityRating>,
}

impl CandidateRecord {
    /// Build a candidate from an input row and its resolved lineage.
    /// Returns `None` when the lineage has no species.
    #[must_use]
    pub fn from_input(input: &GenomeInput, lineage: &Lineage) -> Option<Self> {
        let species = lineage.species?;
        Some(Self {
            id: input.id.clone(),
            name: input.name.clone(),
            score: input.score,
            domain: lineage.domain.clone(),
            genus: lineage.genus,
            species,
            genetic_code: lineage.genetic_code,
            flag: input.flag,
            primary_feature: None,
            primary_dna: None,
            primary_protein: None,
            secondary: None,
            secondary_count: 0,
            rating: None,
        })
    }

    /// The primary protein as a labelled sequence (labelled by feature id)
    #[must_use]
    pub fn protein_sequence(&self) -> Option<Sequence> {
        let protein = self.primary_protein.as_ref()?;
        let label = self
            .primary_feature
            .clone()
            .unwrap_or_else(|| self.id.to_string());
        Some(Sequence::new(label, self.name.clone(), protein.clone()))
    }

    /// Rating with unrated genomes sorted last
    #[must_use]
    pub fn rank(&self) -> usize {
        self.rating
            .map_or(QualityRating::RANKED.len(), QualityRating::rank)
    }

    /// Admission order: rating (best first), score (descending), then id
    #[must_use]
    pub fn admission_order(&self, other: &Self) -> std::cmp::Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| other.score.total_cmp(&self.score))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// True if the protein has two or more ambiguity symbols in a row
#[must_use]
pub fn has_ambiguous_run(protein: &str) -> bool {
    protein
        .as_bytes()
        .windows(2)
        .any(|pair| pair.iter().all(|b| b.eq_ignore_ascii_case(&b'X')))
}
