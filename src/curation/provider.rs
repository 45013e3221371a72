//! Access to genome metadata: taxonomy, annotated features, and sequences
//! keyed by content hash.
//!
//! The curator only talks to the [`SequenceProvider`] trait. [`DumpProvider`]
//! serves the same queries from files exported into one directory:
//!
//! - `taxonomy.json`: array of taxon records
//! - `features.json`: array of feature records
//! - `sequences.fa` or `sequences.fa.gz`: every referenced sequence (headers
//!   are ignored, each record is keyed by its content hash)

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::core::taxonomy::TaxonRecord;
use crate::core::types::{GenomeId, TaxonId};
use crate::parsing::{fasta, ParseError};
use crate::utils::validation::content_hash;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to read provider data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse provider data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse provider sequences: {0}")]
    Parse(#[from] ParseError),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Filter for a bulk feature query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureQuery {
    /// Feature type such as `CDS` or `rRNA` (any type when `None`)
    #[serde(default)]
    pub feature_type: Option<String>,
    /// The product must contain at least one of these (case-insensitive);
    /// an empty list matches every product
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl FeatureQuery {
    #[must_use]
    pub fn new(feature_type: Option<&str>, keywords: &[&str]) -> Self {
        Self {
            feature_type: feature_type.map(str::to_string),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    /// Fuzzy product match, the way a full-text annotation search behaves
    #[must_use]
    pub fn matches(&self, feature: &FeatureRecord) -> bool {
        if let Some(wanted) = &self.feature_type {
            if !feature.feature_type.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }
        if self.keywords.is_empty() {
            return true;
        }
        let product = feature.product.to_lowercase();
        self.keywords
            .iter()
            .any(|k| product.contains(&k.to_lowercase()))
    }
}

/// One annotated feature of a genome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub feature_id: String,
    pub genome_id: GenomeId,
    pub feature_type: String,
    /// Functional annotation
    pub product: String,
    #[serde(default)]
    pub na_md5: Option<String>,
    #[serde(default)]
    pub aa_md5: Option<String>,
    #[serde(default)]
    pub na_length: Option<usize>,
    #[serde(default)]
    pub aa_length: Option<usize>,
}

/// Bulk queries the curator needs from a genome database.
///
/// Every method tolerates unknown keys: missing taxa, features or hashes are
/// simply absent from the result.
pub trait SequenceProvider {
    /// Taxonomy records for the given taxon ids
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup cannot be performed.
    fn taxonomy(&self, ids: &[TaxonId]) -> Result<Vec<TaxonRecord>, ProviderError>;

    /// Features matching `query` that belong to one of `genomes`
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be performed.
    fn features(
        &self,
        query: &FeatureQuery,
        genomes: &[GenomeId],
    ) -> Result<Vec<FeatureRecord>, ProviderError>;

    /// Sequences keyed by content hash
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch cannot be performed.
    fn sequences(&self, hashes: &[String]) -> Result<HashMap<String, String>, ProviderError>;
}

/// Provider backed by exported files, held fully in memory
#[derive(Debug, Clone, Default)]
pub struct DumpProvider {
    taxa: HashMap<TaxonId, TaxonRecord>,
    features: Vec<FeatureRecord>,
    sequences: HashMap<String, String>,
}

impl DumpProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a provider dump directory
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if a required file is missing, or
    /// a read/parse error if a file is malformed.
    pub fn load(dir: &Path) -> Result<Self, ProviderError> {
        let mut provider = Self::new();

        let taxonomy_path = dir.join("taxonomy.json");
        let features_path = dir.join("features.json");
        for path in [&taxonomy_path, &features_path] {
            if !path.is_file() {
                return Err(ProviderError::Unavailable(format!(
                    "{} not found",
                    path.display()
                )));
            }
        }

        let taxa: Vec<TaxonRecord> =
            serde_json::from_str(&std::fs::read_to_string(&taxonomy_path)?)?;
        for taxon in taxa {
            provider.add_taxon(taxon);
        }

        let features: Vec<FeatureRecord> =
            serde_json::from_str(&std::fs::read_to_string(&features_path)?)?;
        for feature in features {
            provider.add_feature(feature);
        }

        let sequences_path = ["sequences.fa", "sequences.fa.gz"]
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                ProviderError::Unavailable(format!("no sequences.fa[.gz] in {}", dir.display()))
            })?;
        for sequence in fasta::read_sequences(&sequences_path)? {
            provider.add_sequence(sequence.residues());
        }

        info!(
            "Loaded provider dump: {} taxa, {} features, {} sequences",
            provider.taxa.len(),
            provider.features.len(),
            provider.sequences.len()
        );
        Ok(provider)
    }

    pub fn add_taxon(&mut self, taxon: TaxonRecord) {
        self.taxa.insert(taxon.id, taxon);
    }

    pub fn add_feature(&mut self, feature: FeatureRecord) {
        self.features.push(feature);
    }

    /// Store a sequence and return its content hash
    pub fn add_sequence(&mut self, residues: &str) -> String {
        let hash = content_hash(residues);
        self.sequences
            .entry(hash.clone())
            .or_insert_with(|| residues.to_string());
        hash
    }
}

impl SequenceProvider for DumpProvider {
    fn taxonomy(&self, ids: &[TaxonId]) -> Result<Vec<TaxonRecord>, ProviderError> {
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.taxa.get(id).cloned())
            .collect())
    }

    fn features(
        &self,
        query: &FeatureQuery,
        genomes: &[GenomeId],
    ) -> Result<Vec<FeatureRecord>, ProviderError> {
        let wanted: HashSet<&GenomeId> = genomes.iter().collect();
        Ok(self
            .features
            .iter()
            .filter(|f| wanted.contains(&f.genome_id) && query.matches(f))
            .cloned()
            .collect())
    }

    fn sequences(&self, hashes: &[String]) -> Result<HashMap<String, String>, ProviderError> {
        Ok(hashes
            .iter()
            .filter_map(|h| {
                self.sequences
                    .get(&h.to_lowercase())
                    .map(|s| (h.clone(), s.clone()))
            })
            .collect())
    }
}
