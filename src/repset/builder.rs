//! Feed a stream of curated genomes into one or more representative sets.
//!
//! Candidates must be offered in a deterministic order (see
//! [`CandidateRecord::admission_order`]); the admission decision for each
//! genome depends on every genome offered before it.

use serde::Serialize;
use tracing::{debug, info};

use crate::core::candidate::CandidateRecord;
use crate::core::kmers::KmerSize;
use crate::core::sequence::Sequence;
use crate::core::types::GenomeId;
use crate::repset::levels::RepresentativeLevels;
use crate::repset::store::{Admission, RepresentativeSet};

/// Where a genome landed at one threshold level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub genome: GenomeId,
    pub threshold: usize,
    /// The representative covering the genome (itself when admitted)
    pub representative: GenomeId,
    pub similarity: usize,
    pub admitted: bool,
}

/// Per-level counts for one build
#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelSummary {
    pub threshold: usize,
    pub representatives: usize,
    pub admitted: usize,
    pub covered: usize,
}

/// Summary of the build process
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub marker: String,
    pub kmer_size: Option<usize>,
    pub observed: usize,
    pub skipped: Vec<GenomeId>,
    pub levels: Vec<LevelSummary>,
}

impl std::fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Representative Set Build Summary")?;
        writeln!(f, "================================")?;
        writeln!(f, "Marker:   {}", self.marker)?;
        if let Some(k) = self.kmer_size {
            writeln!(f, "Kmer:     {k}")?;
        }
        writeln!(f, "Genomes:  {} observed, {} skipped", self.observed, self.skipped.len())?;
        writeln!(f)?;

        writeln!(f, "Levels:")?;
        for level in &self.levels {
            writeln!(
                f,
                "  rep{:<6} {} representatives ({} new, {} covered)",
                level.threshold, level.representatives, level.admitted, level.covered
            )?;
        }

        if !self.skipped.is_empty() {
            writeln!(f)?;
            let ids: Vec<&str> = self.skipped.iter().map(GenomeId::as_str).collect();
            writeln!(f, "Skipped (no primary protein): {}", ids.join(", "))?;
        }
        Ok(())
    }
}

/// Builder that offers each genome to every threshold level in turn
#[derive(Debug)]
pub struct RepSetBuilder {
    levels: RepresentativeLevels,
    memberships: Vec<Membership>,
    observed: usize,
    skipped: Vec<GenomeId>,
}

impl RepSetBuilder {
    /// Start from existing (possibly seeded or reloaded) levels
    #[must_use]
    pub fn new(levels: RepresentativeLevels) -> Self {
        Self {
            levels,
            memberships: Vec::new(),
            observed: 0,
            skipped: Vec::new(),
        }
    }

    /// Offer one curated genome to every level.
    ///
    /// Returns `None` (and records the genome as skipped) if it has no
    /// primary protein.
    pub fn add_candidate(&mut self, candidate: &CandidateRecord) -> Option<Vec<(usize, Admission)>> {
        let Some(sequence) = candidate.protein_sequence() else {
            debug!(id = %candidate.id, "skipping genome without primary protein");
            self.skipped.push(candidate.id.clone());
            return None;
        };
        let feature_id = candidate
            .primary_feature
            .as_deref()
            .unwrap_or_else(|| sequence.label())
            .to_string();
        Some(self.add_sequence(&candidate.id, &candidate.name, &feature_id, &sequence))
    }

    /// Offer one marker protein to every level
    pub fn add_sequence(
        &mut self,
        id: &GenomeId,
        name: &str,
        feature_id: &str,
        sequence: &Sequence,
    ) -> Vec<(usize, Admission)> {
        let outcomes = self.levels.observe(id, name, feature_id, sequence);
        self.observed += 1;

        for (threshold, outcome) in &outcomes {
            let membership = match outcome {
                Admission::Admitted => Membership {
                    genome: id.clone(),
                    threshold: *threshold,
                    representative: id.clone(),
                    similarity: self
                        .levels
                        .get(*threshold)
                        .and_then(|set| set.get(id))
                        .map_or(0, |r| r.kmers.len()),
                    admitted: true,
                },
                Admission::Covered {
                    representative,
                    similarity,
                } => Membership {
                    genome: id.clone(),
                    threshold: *threshold,
                    representative: representative.clone(),
                    similarity: *similarity,
                    admitted: false,
                },
            };
            self.memberships.push(membership);
        }

        outcomes
    }

    /// Offer genomes in the order given
    pub fn add_candidates<'c>(&mut self, candidates: impl IntoIterator<Item = &'c CandidateRecord>) {
        for candidate in candidates {
            self.add_candidate(candidate);
        }
    }

    #[must_use]
    pub fn levels(&self) -> &RepresentativeLevels {
        &self.levels
    }

    /// Every placement recorded so far, in observation order
    #[must_use]
    pub fn memberships(&self) -> &[Membership] {
        &self.memberships
    }

    #[must_use]
    pub fn summary(&self) -> BuildSummary {
        let first = self.levels.iter().next();
        let levels = self
            .levels
            .iter()
            .map(|set| {
                let (admitted, covered) = self
                    .memberships
                    .iter()
                    .filter(|m| m.threshold == set.threshold())
                    .fold((0, 0), |(a, c), m| if m.admitted { (a + 1, c) } else { (a, c + 1) });
                LevelSummary {
                    threshold: set.threshold(),
                    representatives: set.len(),
                    admitted,
                    covered,
                }
            })
            .collect();

        BuildSummary {
            marker: first.map(|s| s.marker().to_string()).unwrap_or_default(),
            kmer_size: first.map(|s| s.kmer_size().get()),
            observed: self.observed,
            skipped: self.skipped.clone(),
            levels,
        }
    }

    /// Finish building and hand back the levels
    #[must_use]
    pub fn finish(self) -> RepresentativeLevels {
        info!(
            "Built {} level(s) from {} genome(s)",
            self.levels.len(),
            self.observed
        );
        self.levels
    }
}

/// Build a single representative set from candidates in the order given
#[must_use]
pub fn build_representative_set(
    candidates: &[CandidateRecord],
    marker: &str,
    threshold: usize,
    kmer_size: KmerSize,
) -> RepresentativeSet {
    let mut builder = RepSetBuilder::new(RepresentativeLevels::with_thresholds(
        marker,
        kmer_size,
        &[threshold],
    ));
    builder.add_candidates(candidates);
    builder
        .finish()
        .remove(threshold)
        .unwrap_or_else(|| RepresentativeSet::new(marker, kmer_size, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxonomy::Lineage;
    use crate::core::candidate::GenomeInput;
    use crate::core::types::{Domain, QualityRating};

    const PROT_A: &str = "MSHLAELVASAKAAISQASDVAALDNVRVEYLGKKGHLTLQMTTLRELPPEERPAAGAVINEAKEQVQQALNARKAELESAALNARLAAETIDVSLPGRRIENGG";
    const PROT_B: &str = "MQQLDALVSEALAEIAAAHSLDQLEAVRVKYLGKKGELTALLKSLGQLSPEERPAAGQAINQAKQAIQEALDARKAQLEQAELNAKLAAEKIDVTLPGRRQATGG";

    fn candidate(id: &str, protein: Option<&str>) -> CandidateRecord {
        let input = GenomeInput {
            id: GenomeId::new(id),
            name: format!("Genome {id}"),
            lineage: vec![],
            score: 90.0,
            flag: None,
        };
        let lineage = Lineage {
            genus: Some(561),
            species: Some(562),
            domain: Domain::Bacteria,
            genetic_code: 11,
        };
        let mut c = CandidateRecord::from_input(&input, &lineage).unwrap();
        c.primary_protein = protein.map(str::to_string);
        c.primary_feature = Some(format!("fig|{id}.peg.1"));
        c.rating = Some(QualityRating::Normal);
        c
    }

    fn k() -> KmerSize {
        KmerSize::new(8).unwrap()
    }

    #[test]
    fn test_build_single_set() {
        let candidates = vec![
            candidate("1.1", Some(PROT_A)),
            candidate("1.2", Some(PROT_A)),
            candidate("1.3", Some(PROT_B)),
        ];
        let set = build_representative_set(&candidates, "PheS", 20, k());
        let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1.1", "1.3"]);
        assert_eq!(set.get(&GenomeId::new("1.1")).unwrap().feature_id, "fig|1.1.peg.1");
    }

    #[test]
    fn test_builder_tracks_memberships() {
        let levels = RepresentativeLevels::with_thresholds("PheS", k(), &[20]);
        let mut builder = RepSetBuilder::new(levels);
        builder.add_candidates(&[
            candidate("1.1", Some(PROT_A)),
            candidate("1.2", Some(PROT_A)),
            candidate("1.4", None),
        ]);

        let memberships = builder.memberships();
        assert_eq!(memberships.len(), 2);
        assert!(memberships[0].admitted);
        assert_eq!(memberships[1].representative, GenomeId::new("1.1"));
        assert!(!memberships[1].admitted);

        let summary = builder.summary();
        assert_eq!(summary.observed, 2);
        assert_eq!(summary.skipped, vec![GenomeId::new("1.4")]);
        assert_eq!(summary.levels[0].admitted, 1);
        assert_eq!(summary.levels[0].covered, 1);
        assert_eq!(summary.kmer_size, Some(8));

        let text = summary.to_string();
        assert!(text.contains("rep20"));
        assert!(text.contains("1.4"));
    }

    #[test]
    fn test_empty_input_gives_empty_set() {
        let set = build_representative_set(&[], "PheS", 20, k());
        assert!(set.is_empty());
        assert_eq!(set.threshold(), 20);
    }

    #[test]
    fn test_add_raw_sequences() {
        let mut builder = RepSetBuilder::new(RepresentativeLevels::with_thresholds("PheS", k(), &[20, 1000]));
        let first = builder.add_sequence(&GenomeId::new("q1"), "", "q1", &Sequence::new("q1", "", PROT_A));
        assert!(first.iter().all(|(_, a)| a.is_admitted()));
        let second = builder.add_sequence(&GenomeId::new("q2"), "", "q2", &Sequence::new("q2", "", PROT_A));
        // Identical proteins share every kmer but never reach a threshold above their size
        assert!(!second[0].1.is_admitted());
        assert!(second[1].1.is_admitted());
        assert_eq!(builder.levels().get(1000).unwrap().len(), 2);
    }
}
