//! Multi-pass curation of candidate genomes.
//!
//! Phases, in order:
//! 1. ingestion: resolve lineages, drop genomes without a species
//! 2. primary marker: pick one verified feature per genome, fetch its DNA and
//!    protein by content hash in deduplicated batches, drop genomes whose
//!    sequences are missing or ambiguous
//! 3. secondary marker: fetch every copy in one batch, merge and rate them,
//!    defer unconfirmed single copies, record genus reference profiles
//! 4. retry: rate deferred genomes against their genus reference profile
//!
//! Every per-genome loss is counted in [`Statistics`] and never aborts the run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::candidate::{has_ambiguous_run, CandidateRecord, GenomeInput};
use crate::core::kmers::{KmerConfig, KmerSet};
use crate::core::sequence::Sequence;
use crate::core::taxonomy::{Lineage, TaxonRecord};
use crate::core::types::{GenomeId, QualityRating, TaxonId};
use crate::curation::cache::{HashBatchCache, ResolvedBatch};
use crate::curation::provider::{FeatureQuery, FeatureRecord, ProviderError, SequenceProvider};
use crate::curation::secondary::{SecondaryValidator, SecondaryVerdict};
use crate::curation::stats::Statistics;
use crate::utils::validation::{has_role, normalize_md5};

/// Default number of distinct hashes fetched per batch
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default primary marker role
pub const DEFAULT_PRIMARY_FUNCTION: &str = "Phenylalanyl-tRNA synthetase alpha chain";

#[derive(Error, Debug)]
pub enum CurationError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Curation cancelled")]
    Cancelled,
}

/// How to find a marker's features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub name: String,
    #[serde(default)]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub product_keywords: Vec<String>,
}

impl MarkerSpec {
    #[must_use]
    pub fn query(&self) -> FeatureQuery {
        FeatureQuery {
            feature_type: self.feature_type.clone(),
            keywords: self.product_keywords.clone(),
        }
    }
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            name: "SSU rRNA".to_string(),
            feature_type: Some("rRNA".to_string()),
            product_keywords: vec!["SSU rRNA".to_string(), "16S".to_string()],
        }
    }
}

/// Curation settings, fixed for the duration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Distinct hashes per primary-marker fetch
    pub batch_size: usize,
    pub kmers: KmerConfig,
    /// Role the primary marker feature must carry
    pub primary_function: String,
    pub secondary: MarkerSpec,
    /// Maximum distance between agreeing secondary copies
    pub secondary_tolerance: f64,
    /// Distance to the genus profile at or above which a copy is rejected
    pub genus_distance_ceiling: f64,
    pub good_secondary_length: usize,
    pub min_secondary_length: usize,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            kmers: KmerConfig::default(),
            primary_function: DEFAULT_PRIMARY_FUNCTION.to_string(),
            secondary: MarkerSpec::default(),
            secondary_tolerance: 0.3,
            genus_distance_ceiling: 0.9,
            good_secondary_length: 1400,
            min_secondary_length: 500,
        }
    }
}

impl CurationConfig {
    /// Check settings that would make every genome fail
    ///
    /// # Errors
    ///
    /// Returns `CurationError::Config` describing the first invalid setting.
    pub fn validate(&self) -> Result<(), CurationError> {
        if self.batch_size == 0 {
            return Err(CurationError::Config("batch size must be positive".to_string()));
        }
        if self.primary_function.trim().is_empty() {
            return Err(CurationError::Config("primary function is empty".to_string()));
        }
        for (name, value) in [
            ("secondary tolerance", self.secondary_tolerance),
            ("genus distance ceiling", self.genus_distance_ceiling),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CurationError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.min_secondary_length > self.good_secondary_length {
            return Err(CurationError::Config(format!(
                "minimum secondary length {} exceeds good length {}",
                self.min_secondary_length, self.good_secondary_length
            )));
        }
        Ok(())
    }

    fn secondary_validator(&self) -> SecondaryValidator {
        SecondaryValidator {
            kmer_size: self.kmers.dna,
            tolerance: self.secondary_tolerance,
            min_length: self.min_secondary_length,
            good_length: self.good_secondary_length,
        }
    }
}

/// Ordering key: score descending, then id
#[derive(Debug, Clone)]
struct ScoreKey {
    score: f64,
    id: GenomeId,
}

impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Which primary sequence a flushed batch carries
#[derive(Debug, Clone, Copy)]
enum PrimaryKind {
    Dna,
    Protein,
}

/// Drives a candidate collection through the curation phases
pub struct GenomeQualityCurator<'p, P: SequenceProvider + ?Sized> {
    provider: &'p P,
    config: CurationConfig,
    candidates: HashMap<GenomeId, CandidateRecord>,
    order: BTreeSet<ScoreKey>,
    stats: Statistics,
    dna_cache: HashBatchCache,
    protein_cache: HashBatchCache,
    deferred: Vec<GenomeId>,
    genus_profiles: HashMap<TaxonId, KmerSet>,
    stop: Option<Arc<AtomicBool>>,
}

impl<'p, P: SequenceProvider + ?Sized> GenomeQualityCurator<'p, P> {
    /// # Errors
    ///
    /// Returns `CurationError::Config` if the configuration is invalid.
    pub fn new(provider: &'p P, config: CurationConfig) -> Result<Self, CurationError> {
        config.validate()?;
        Ok(Self {
            provider,
            dna_cache: HashBatchCache::new(config.batch_size),
            protein_cache: HashBatchCache::new(config.batch_size),
            config,
            candidates: HashMap::new(),
            order: BTreeSet::new(),
            stats: Statistics::new(),
            deferred: Vec::new(),
            genus_profiles: HashMap::new(),
            stop: None,
        })
    }

    /// Check `stop` at every batch boundary and abandon the phase once it is set
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    #[must_use]
    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &GenomeId) -> Option<&CandidateRecord> {
        self.candidates.get(id)
    }

    /// Candidates by quality score (best first), then id
    pub fn iter(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.order.iter().filter_map(|key| self.candidates.get(&key.id))
    }

    /// Candidates in admission order: rating, score (descending), id
    #[must_use]
    pub fn ranked(&self) -> Vec<&CandidateRecord> {
        let mut ranked: Vec<&CandidateRecord> = self.candidates.values().collect();
        ranked.sort_by(|a, b| a.admission_order(b));
        ranked
    }

    /// Genomes deferred to the genus-consensus retry
    #[must_use]
    pub fn deferred(&self) -> &[GenomeId] {
        &self.deferred
    }

    /// Genomes with a chosen primary feature still missing a sequence
    #[must_use]
    pub fn unresolved_primary(&self) -> Vec<GenomeId> {
        self.iter()
            .filter(|c| {
                c.primary_feature.is_some()
                    && (c.primary_dna.is_none() || c.primary_protein.is_none())
            })
            .map(|c| c.id.clone())
            .collect()
    }

    /// Run every phase in order
    ///
    /// # Errors
    ///
    /// Returns the first provider failure or `CurationError::Cancelled`.
    pub fn run(&mut self, inputs: &[GenomeInput]) -> Result<(), CurationError> {
        self.ingest(inputs)?;
        self.resolve_primary()?;
        self.resolve_secondary()?;
        self.retry_deferred();
        Ok(())
    }

    /// Phase 1: resolve lineages and admit genomes that have a species.
    /// Returns the number of genomes added.
    ///
    /// # Errors
    ///
    /// Returns an error if the taxonomy lookup fails.
    pub fn ingest(&mut self, inputs: &[GenomeInput]) -> Result<usize, CurationError> {
        self.checkpoint()?;
        let mut taxon_ids: Vec<TaxonId> = inputs.iter().flat_map(|g| g.lineage.iter().copied()).collect();
        taxon_ids.sort_unstable();
        taxon_ids.dedup();

        let taxonomy: HashMap<TaxonId, TaxonRecord> = self
            .provider
            .taxonomy(&taxon_ids)?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let mut added = 0;
        for input in inputs {
            self.stats.increment("input-genomes");
            if self.candidates.contains_key(&input.id) {
                self.stats.increment("removed-duplicate");
                continue;
            }
            let lineage = Lineage::resolve(&input.lineage, &taxonomy);
            let Some(candidate) = CandidateRecord::from_input(input, &lineage) else {
                self.stats.increment("removed-no-species");
                continue;
            };
            self.insert(candidate);
            added += 1;
        }

        info!(
            "Ingested {added} of {} genome(s) ({} taxa resolved)",
            inputs.len(),
            taxonomy.len()
        );
        Ok(added)
    }

    /// Phase 2: choose the primary feature of each genome and fetch its
    /// sequences in deduplicated batches.
    ///
    /// Genomes that already have both sequences are skipped, so after a
    /// failed fetch the phase can be run again and only the remaining
    /// hashes are requested.
    ///
    /// # Errors
    ///
    /// Returns a provider failure or `CurationError::Cancelled`; every batch
    /// completed before that point stays applied.
    pub fn resolve_primary(&mut self) -> Result<(), CurationError> {
        self.checkpoint()?;
        let ids = self.ordered_ids();
        let query = FeatureQuery::new(Some("CDS"), &[self.config.primary_function.as_str()]);
        let features = self.provider.features(&query, &ids)?;
        let chosen = self.choose_primary_features(features);

        for id in ids {
            let Some(feature) = chosen.get(&id) else {
                self.remove(&id, "removed-no-primary");
                continue;
            };
            let Some(candidate) = self.candidates.get_mut(&id) else {
                continue;
            };
            candidate.primary_feature = Some(feature.feature_id.clone());

            let hashes = (
                feature.na_md5.as_deref().and_then(normalize_md5),
                feature.aa_md5.as_deref().and_then(normalize_md5),
            );
            let (Some(na_md5), Some(aa_md5)) = hashes else {
                self.remove(&id, "removed-no-primary-hash");
                continue;
            };
            let need_dna = candidate.primary_dna.is_none();
            let need_protein = candidate.primary_protein.is_none();

            if need_dna && self.dna_cache.add(&na_md5, &id) {
                self.flush_primary(PrimaryKind::Dna)?;
            }
            if need_protein && self.protein_cache.add(&aa_md5, &id) {
                self.flush_primary(PrimaryKind::Protein)?;
            }
        }
        self.flush_primary(PrimaryKind::Dna)?;
        self.flush_primary(PrimaryKind::Protein)?;

        for id in self.ordered_ids() {
            let Some(candidate) = self.candidates.get(&id) else {
                continue;
            };
            let reason = match (&candidate.primary_dna, &candidate.primary_protein) {
                (Some(_), Some(protein)) if has_ambiguous_run(protein) => "removed-ambiguous-primary",
                (Some(_), Some(_)) => continue,
                _ => "removed-missing-primary",
            };
            self.remove(&id, reason);
        }

        info!("Primary marker resolved for {} genome(s)", self.candidates.len());
        Ok(())
    }

    /// Phase 3: fetch, merge and rate secondary marker copies.
    ///
    /// # Errors
    ///
    /// Returns a provider failure or `CurationError::Cancelled`.
    pub fn resolve_secondary(&mut self) -> Result<(), CurationError> {
        self.checkpoint()?;
        let ids = self.ordered_ids();
        let features = self.provider.features(&self.config.secondary.query(), &ids)?;

        let mut cache = HashBatchCache::unbounded();
        let mut copies_by_genome: HashMap<GenomeId, Vec<String>> = HashMap::new();
        for feature in features {
            if !self.candidates.contains_key(&feature.genome_id) {
                continue;
            }
            let Some(hash) = feature.na_md5.as_deref().and_then(normalize_md5) else {
                self.stats.increment("secondary-feature-without-hash");
                continue;
            };
            cache.add(&hash, &feature.genome_id);
            copies_by_genome.entry(feature.genome_id).or_default().push(hash);
        }

        self.checkpoint()?;
        let batch = cache.flush(self.provider)?;
        let sequences: HashMap<String, String> = batch
            .resolved
            .into_iter()
            .map(|r| (r.hash, r.sequence))
            .collect();
        if !batch.missing.is_empty() {
            self.stats.add("missing-secondary-sequence", batch.missing.len() as u64);
        }

        let validator = self.config.secondary_validator();
        for id in ids {
            let copies: Vec<String> = copies_by_genome
                .get(&id)
                .map(|hashes| hashes.iter().filter_map(|h| sequences.get(h).cloned()).collect())
                .unwrap_or_default();

            let Some(verdict) = validator.validate(&copies) else {
                self.remove(&id, "removed-no-secondary");
                continue;
            };
            let Some(candidate) = self.candidates.get_mut(&id) else {
                continue;
            };
            candidate.secondary_count = copies.len();
            candidate.secondary = Some(verdict.sequence().to_string());

            match verdict {
                SecondaryVerdict::Agreed { sequence, rating } => {
                    let rating = apply_flag(rating, candidate.flag);
                    candidate.rating = Some(rating);
                    self.stats.increment("secondary-agreed");
                    if rating.meets(QualityRating::Normal) {
                        if let Some(genus) = candidate.genus {
                            let k = self.config.kmers.dna;
                            self.genus_profiles.entry(genus).or_insert_with(|| {
                                KmerSet::build(Sequence::new(id.to_string(), "", sequence), k)
                            });
                        }
                    }
                }
                SecondaryVerdict::Single { .. } => {
                    candidate.rating = Some(QualityRating::SingleSsu);
                    if candidate.genus.is_some() {
                        self.deferred.push(id.clone());
                        self.stats.increment("secondary-deferred");
                    } else {
                        self.stats.increment("secondary-single-no-genus");
                    }
                }
                SecondaryVerdict::Disagreed { .. } => {
                    candidate.rating = Some(QualityRating::BadSsu);
                    self.stats.increment("secondary-disagreed");
                }
                SecondaryVerdict::TooShort { .. } => {
                    candidate.rating = Some(QualityRating::BadSsu);
                    self.stats.increment("secondary-too-short");
                }
            }
        }

        info!(
            "Secondary marker rated for {} genome(s), {} deferred, {} genus profile(s)",
            self.candidates.len(),
            self.deferred.len(),
            self.genus_profiles.len()
        );
        Ok(())
    }

    /// Phase 4: rate deferred single-copy genomes against their genus profile.
    ///
    /// Genomes whose genus has no profile keep their pre-retry rating; no
    /// deferred genome is removed.
    pub fn retry_deferred(&mut self) {
        let validator = self.config.secondary_validator();
        let ceiling = self.config.genus_distance_ceiling;
        let k = self.config.kmers.dna;

        for id in std::mem::take(&mut self.deferred) {
            let Some(candidate) = self.candidates.get_mut(&id) else {
                continue;
            };
            let (Some(genus), Some(secondary)) = (candidate.genus, &candidate.secondary) else {
                continue;
            };
            let Some(profile) = self.genus_profiles.get(&genus) else {
                self.stats.increment("retry-no-genus-profile");
                continue;
            };

            let kmers = KmerSet::build(Sequence::new(id.to_string(), "", secondary.as_str()), k);
            let distance = profile.distance(&kmers);
            if distance < ceiling {
                let rating = apply_flag(validator.rate_length(secondary.len()), candidate.flag);
                candidate.rating = Some(rating);
                self.stats.increment("retry-accepted");
            } else {
                candidate.rating = Some(QualityRating::BadSsu);
                self.stats.increment("retry-rejected");
            }
            debug!("Retried {id} against genus {genus}: distance {distance:.3}");
        }
    }

    /// Remove every genome rated worse than `minimum`, after recording
    /// per-rating counts in `stats`. Returns the number removed.
    pub fn prune(&mut self, minimum: QualityRating, stats: &mut Statistics) -> usize {
        for candidate in self.candidates.values() {
            let name = candidate.rating.map_or("unrated", QualityRating::name);
            stats.increment(&format!("rating-{name}"));
        }

        let doomed: Vec<GenomeId> = self
            .iter()
            .filter(|c| !c.rating.is_some_and(|r| r.meets(minimum)))
            .map(|c| c.id.clone())
            .collect();
        for id in &doomed {
            self.remove(id, "removed-below-minimum-rating");
        }
        if !doomed.is_empty() {
            info!("Pruned {} genome(s) rated below {minimum}", doomed.len());
        }
        doomed.len()
    }

    /// Consume the curator, returning candidates in admission order and the counters
    #[must_use]
    pub fn into_parts(self) -> (Vec<CandidateRecord>, Statistics) {
        let mut candidates: Vec<CandidateRecord> = self.candidates.into_values().collect();
        candidates.sort_by(CandidateRecord::admission_order);
        (candidates, self.stats)
    }

    fn checkpoint(&self) -> Result<(), CurationError> {
        match &self.stop {
            Some(stop) if stop.load(Ordering::Relaxed) => Err(CurationError::Cancelled),
            _ => Ok(()),
        }
    }

    fn insert(&mut self, candidate: CandidateRecord) {
        self.order.insert(ScoreKey {
            score: candidate.score,
            id: candidate.id.clone(),
        });
        self.candidates.insert(candidate.id.clone(), candidate);
    }

    fn remove(&mut self, id: &GenomeId, reason: &str) {
        if let Some(candidate) = self.candidates.remove(id) {
            self.order.remove(&ScoreKey {
                score: candidate.score,
                id: candidate.id,
            });
            self.stats.increment(reason);
            debug!("Removed {id}: {reason}");
        }
    }

    fn ordered_ids(&self) -> Vec<GenomeId> {
        self.order.iter().map(|key| key.id.clone()).collect()
    }

    /// Keep the longest verified primary feature per genome (ties: smaller feature id)
    fn choose_primary_features(&mut self, features: Vec<FeatureRecord>) -> HashMap<GenomeId, FeatureRecord> {
        let mut chosen: HashMap<GenomeId, FeatureRecord> = HashMap::new();
        for feature in features {
            if !has_role(&feature.product, &self.config.primary_function) {
                self.stats.increment("rejected-role-mismatch");
                continue;
            }
            match chosen.get(&feature.genome_id) {
                Some(best) if !is_better_primary(&feature, best) => {}
                _ => {
                    chosen.insert(feature.genome_id.clone(), feature);
                }
            }
        }
        chosen
    }

    fn flush_primary(&mut self, kind: PrimaryKind) -> Result<(), CurationError> {
        let cache = match kind {
            PrimaryKind::Dna => &mut self.dna_cache,
            PrimaryKind::Protein => &mut self.protein_cache,
        };
        if cache.is_empty() {
            return Ok(());
        }
        match &self.stop {
            Some(stop) if stop.load(Ordering::Relaxed) => return Err(CurationError::Cancelled),
            _ => {}
        }
        let batch: ResolvedBatch = cache.flush(self.provider)?;

        if !batch.missing.is_empty() {
            self.stats.add("missing-primary-sequence", batch.missing.len() as u64);
        }
        for resolved in batch.resolved {
            for owner in &resolved.owners {
                if let Some(candidate) = self.candidates.get_mut(owner) {
                    let slot = match kind {
                        PrimaryKind::Dna => &mut candidate.primary_dna,
                        PrimaryKind::Protein => &mut candidate.primary_protein,
                    };
                    *slot = Some(resolved.sequence.clone());
                }
            }
        }
        Ok(())
    }
}

fn is_better_primary(candidate: &FeatureRecord, best: &FeatureRecord) -> bool {
    let len = candidate.aa_length.unwrap_or(0);
    let best_len = best.aa_length.unwrap_or(0);
    len > best_len || (len == best_len && candidate.feature_id < best.feature_id)
}

/// A validated genome carrying an upstream flag is rated at that flag
fn apply_flag(rating: QualityRating, flag: Option<QualityRating>) -> QualityRating {
    match flag {
        Some(flag) if rating == QualityRating::Normal && flag.meets(rating) => flag,
        _ => rating,
    }
}

/// Curate `inputs` end to end, returning rated candidates in admission
/// order and the counters of every removal and rating.
///
/// # Errors
///
/// Returns `CurationError::Config` for invalid settings, or the first
/// provider failure.
pub fn curate_candidates<P: SequenceProvider + ?Sized>(
    provider: &P,
    inputs: &[GenomeInput],
    config: CurationConfig,
) -> Result<(Vec<CandidateRecord>, Statistics), CurationError> {
    let mut curator = GenomeQualityCurator::new(provider, config)?;
    curator.run(inputs)?;
    Ok(curator.into_parts())
}
