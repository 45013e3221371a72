use serde::Serialize;

use crate::core::kmers::KmerSet;
use crate::core::sequence::Sequence;
use crate::core::types::GenomeId;
use crate::repset::store::{RepresentativeRecord, RepresentativeSet};

/// Result of looking up the closest representative for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Representation {
    /// Closest representative, `None` if the set is empty or nothing shares a kmer
    pub representative: Option<GenomeId>,

    /// Kmers shared with the closest representative
    pub similarity: usize,

    /// Jaccard distance to the closest representative (1.0 when there is none)
    pub distance: f64,

    /// Threshold of the set that was searched
    pub threshold: usize,
}

impl Representation {
    fn uncovered(threshold: usize) -> Self {
        Self {
            representative: None,
            similarity: 0,
            distance: 1.0,
            threshold,
        }
    }

    /// True if the closest representative meets the set's threshold
    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.representative.is_some() && self.similarity >= self.threshold
    }
}

/// Read-only nearest-representative lookup over one set
pub struct NearestRepresentativeQuery<'a> {
    set: &'a RepresentativeSet,
}

impl<'a> NearestRepresentativeQuery<'a> {
    pub fn new(set: &'a RepresentativeSet) -> Self {
        Self { set }
    }

    /// Find the representative sharing the most kmers with `query`.
    ///
    /// Linear scan with a best-so-far accumulator. Equal similarities go to
    /// the representative whose id sorts first, so the answer never depends
    /// on insertion order. A best similarity of 0 reports no representative,
    /// except at threshold 0 where every representative covers the query.
    #[must_use]
    pub fn find(&self, query: &KmerSet) -> Representation {
        let threshold = self.set.threshold();
        let mut best: Option<(&RepresentativeRecord, usize)> = None;

        for record in self.set {
            let similarity = record.kmers.similarity(query);
            let better = match best {
                None => true,
                Some((current, current_sim)) => {
                    similarity > current_sim
                        || (similarity == current_sim && record.id < current.id)
                }
            };
            if better {
                best = Some((record, similarity));
            }
        }

        match best {
            Some((record, similarity)) if similarity > 0 || threshold == 0 => Representation {
                representative: Some(record.id.clone()),
                similarity,
                distance: query.distance_with_shared(&record.kmers, similarity),
                threshold,
            },
            _ => Representation::uncovered(threshold),
        }
    }

    /// Build kmers for `sequence` at the set's kmer size and look it up
    #[must_use]
    pub fn find_sequence(&self, sequence: Sequence) -> Representation {
        self.find(&KmerSet::build(sequence, self.set.kmer_size()))
    }
}

/// Find the closest representative in `set` for a raw sequence
#[must_use]
pub fn query_nearest(set: &RepresentativeSet, sequence: Sequence) -> Representation {
    NearestRepresentativeQuery::new(set).find_sequence(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kmers::KmerSize;

    fn k() -> KmerSize {
        KmerSize::new(2).unwrap()
    }

    fn add(set: &mut RepresentativeSet, id: &str, kmers: &[&str]) {
        let record = RepresentativeRecord::new(
            GenomeId::new(id),
            id,
            id,
            KmerSet::from_kmers(id, k(), kmers.iter().copied()),
        );
        set.observe_record(record);
    }

    #[test]
    fn test_empty_set_is_uncovered() {
        let set = RepresentativeSet::new("m", k(), 1);
        let query = KmerSet::from_kmers("q", k(), ["AA", "CC"]);
        let rep = NearestRepresentativeQuery::new(&set).find(&query);
        assert_eq!(rep.representative, None);
        assert_eq!(rep.similarity, 0);
        assert!(!rep.is_covered());
        assert!((rep.distance - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_picks_highest_similarity() {
        let mut set = RepresentativeSet::new("m", k(), 10);
        add(&mut set, "r1", &["AA", "AC"]);
        add(&mut set, "r2", &["AA", "AC", "AD", "AE"]);
        let query = KmerSet::from_kmers("q", k(), ["AA", "AC", "AD"]);

        let rep = NearestRepresentativeQuery::new(&set).find(&query);
        assert_eq!(rep.representative, Some(GenomeId::new("r2")));
        assert_eq!(rep.similarity, 3);
        // union = 3 + 4 - 3 = 4
        assert!((rep.distance - 0.25).abs() < 1e-12);
        assert!(!rep.is_covered());
    }

    #[test]
    fn test_tie_breaks_on_id() {
        let mut set = RepresentativeSet::new("m", k(), 10);
        add(&mut set, "zeta", &["AA", "AC"]);
        add(&mut set, "alpha", &["AA", "AC", "ZZ"]);
        let query = KmerSet::from_kmers("q", k(), ["AA", "AC"]);

        let rep = NearestRepresentativeQuery::new(&set).find(&query);
        assert_eq!(rep.representative, Some(GenomeId::new("alpha")));
        assert_eq!(rep.similarity, 2);
    }

    #[test]
    fn test_no_shared_kmers_has_no_match() {
        let mut set = RepresentativeSet::new("m", k(), 1);
        add(&mut set, "r1", &["AA"]);
        let query = KmerSet::from_kmers("q", k(), ["CC"]);
        let rep = NearestRepresentativeQuery::new(&set).find(&query);
        assert_eq!(rep.representative, None);
        assert!(!rep.is_covered());
    }

    #[test]
    fn test_covered_at_threshold() {
        let mut set = RepresentativeSet::new("m", k(), 2);
        add(&mut set, "r1", &["AA", "AC", "AD"]);
        let query = KmerSet::from_kmers("q", k(), ["AA", "AC"]);
        assert!(NearestRepresentativeQuery::new(&set).find(&query).is_covered());
    }

    #[test]
    fn test_query_nearest_builds_kmers() {
        let mut set = RepresentativeSet::new("m", KmerSize::new(3).unwrap(), 3);
        set.observe(
            GenomeId::new("r1"),
            "r1",
            "f1",
            Sequence::new("s", "", "MKVLAAGIVG"),
        );
        let rep = query_nearest(&set, Sequence::new("q", "", "MKVLAAG"));
        assert_eq!(rep.representative, Some(GenomeId::new("r1")));
        assert_eq!(rep.similarity, 5);
        assert!(rep.is_covered());
    }

    #[test]
    fn test_zero_threshold_covers_unrelated_query() {
        let mut set = RepresentativeSet::new("m", k(), 0);
        add(&mut set, "r2", &["AA"]);
        add(&mut set, "r1", &["CC"]);
        assert_eq!(set.len(), 1);

        let query = KmerSet::from_kmers("q", k(), ["GG"]);
        let rep = NearestRepresentativeQuery::new(&set).find(&query);
        assert_eq!(rep.representative, Some(GenomeId::new("r2")));
        assert_eq!(rep.similarity, 0);
        assert!(rep.is_covered());
        assert!((rep.distance - 1.0).abs() < f64::EPSILON);

        // Above zero an unrelated query still has no representative
        let mut set = RepresentativeSet::new("m", k(), 1);
        add(&mut set, "r2", &["AA"]);
        assert_eq!(NearestRepresentativeQuery::new(&set).find(&query).representative, None);
    }
}
