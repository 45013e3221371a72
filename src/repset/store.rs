use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::kmers::{KmerError, KmerSet, KmerSize};
use crate::core::sequence::Sequence;
use crate::core::types::GenomeId;
use crate::matching::nearest::NearestRepresentativeQuery;

#[derive(Error, Debug)]
pub enum RepSetError {
    #[error("Failed to read representative set: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse representative set: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode representative set: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Unrecognized representative set format: {0}")]
    UnknownFormat(String),

    #[error("Marker mismatch: set indexes '{expected}', source indexes '{found}'")]
    MarkerMismatch { expected: String, found: String },

    #[error("Invalid kmer size: {0}")]
    Kmer(#[from] KmerError),

    #[error("Failed to write representative set: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Artifact version for compatibility checking
pub const REPSET_VERSION: &str = "1.0.0";

/// On-disk encoding of a representative set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Bincode,
}

impl ArtifactFormat {
    /// Detect format from file extension
    ///
    /// # Errors
    ///
    /// Returns `RepSetError::UnknownFormat` for anything but `.json` or `.bin`.
    pub fn from_path(path: &Path) -> Result<Self, RepSetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("bin") => Ok(Self::Bincode),
            _ => Err(RepSetError::UnknownFormat(path.display().to_string())),
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Bincode => "bin",
        }
    }
}

/// Serializable representative entry. Kmers are rebuilt on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentativeEntry {
    pub id: GenomeId,
    pub name: String,
    pub feature_id: String,
    pub sequence: String,
}

/// Serializable representative set format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepSetData {
    pub version: String,
    pub created_at: String,
    pub marker: String,
    pub kmer_size: KmerSize,
    pub threshold: usize,
    pub representatives: Vec<RepresentativeEntry>,
}

/// A genome retained as a cluster seed
#[derive(Debug, Clone)]
pub struct RepresentativeRecord {
    pub id: GenomeId,
    pub name: String,
    /// Feature the marker sequence came from
    pub feature_id: String,
    pub kmers: KmerSet,
}

impl RepresentativeRecord {
    pub fn new(
        id: GenomeId,
        name: impl Into<String>,
        feature_id: impl Into<String>,
        kmers: KmerSet,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            feature_id: feature_id.into(),
            kmers,
        }
    }

    fn to_entry(&self) -> RepresentativeEntry {
        RepresentativeEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            feature_id: self.feature_id.clone(),
            sequence: self.kmers.sequence().residues().to_string(),
        }
    }

    fn from_entry(entry: RepresentativeEntry, k: KmerSize) -> Self {
        let sequence = Sequence::new(entry.feature_id.clone(), entry.name.clone(), entry.sequence);
        Self {
            id: entry.id,
            name: entry.name,
            feature_id: entry.feature_id,
            kmers: KmerSet::build(sequence, k),
        }
    }
}

/// Outcome of offering a candidate to a representative set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The candidate became a new representative
    Admitted,
    /// An existing representative already covers the candidate
    Covered {
        representative: GenomeId,
        similarity: usize,
    },
}

impl Admission {
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// An insertion-ordered set of representatives at one similarity threshold.
///
/// Built greedily: a candidate is admitted only if no current representative
/// shares at least `threshold` kmers with it. After any sequence of
/// admissions every pair of representatives has similarity below the
/// threshold. The result depends on the order candidates are offered in.
#[derive(Debug, Clone)]
pub struct RepresentativeSet {
    marker: String,
    kmer_size: KmerSize,
    threshold: usize,
    records: Vec<RepresentativeRecord>,

    /// Index: genome ID -> index in records vec
    id_to_index: HashMap<GenomeId, usize>,
}

impl RepresentativeSet {
    /// Create an empty set
    pub fn new(marker: impl Into<String>, kmer_size: KmerSize, threshold: usize) -> Self {
        Self {
            marker: marker.into(),
            kmer_size,
            threshold,
            records: Vec::new(),
            id_to_index: HashMap::new(),
        }
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    #[must_use]
    pub fn kmer_size(&self) -> KmerSize {
        self.kmer_size
    }

    /// Minimum shared-kmer count for a candidate to count as covered
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of representatives
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &GenomeId) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Get a representative by genome ID
    #[must_use]
    pub fn get(&self, id: &GenomeId) -> Option<&RepresentativeRecord> {
        self.id_to_index.get(id).map(|&idx| &self.records[idx])
    }

    /// Representatives in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, RepresentativeRecord> {
        self.records.iter()
    }

    /// Offer a genome's marker sequence to the set
    pub fn observe(
        &mut self,
        id: GenomeId,
        name: impl Into<String>,
        feature_id: impl Into<String>,
        sequence: Sequence,
    ) -> Admission {
        let kmers = KmerSet::build(sequence, self.kmer_size);
        self.observe_record(RepresentativeRecord::new(id, name, feature_id, kmers))
    }

    /// Offer a prepared record to the set, admitting it if nothing covers it
    pub fn observe_record(&mut self, mut record: RepresentativeRecord) -> Admission {
        if record.kmers.k() != self.kmer_size {
            record.kmers = record.kmers.rebuild(self.kmer_size);
        }

        if let Some(existing) = self.get(&record.id) {
            return Admission::Covered {
                representative: existing.id.clone(),
                similarity: existing.kmers.similarity(&record.kmers),
            };
        }

        let representation = NearestRepresentativeQuery::new(self).find(&record.kmers);
        if representation.is_covered() {
            if let Some(representative) = representation.representative {
                return Admission::Covered {
                    representative,
                    similarity: representation.similarity,
                };
            }
        }

        debug!(id = %record.id, threshold = self.threshold, "admitted new representative");
        self.insert(record);
        Admission::Admitted
    }

    /// Copy every representative of `source` that is not already present,
    /// without running admission. Returns the number of records copied.
    ///
    /// # Errors
    ///
    /// Returns `RepSetError::MarkerMismatch` if the sets index different markers.
    pub fn absorb(&mut self, source: &RepresentativeSet) -> Result<usize, RepSetError> {
        if source.marker != self.marker {
            return Err(RepSetError::MarkerMismatch {
                expected: self.marker.clone(),
                found: source.marker.clone(),
            });
        }

        let mut copied = 0;
        for record in &source.records {
            if self.contains(&record.id) {
                continue;
            }
            let mut record = record.clone();
            if record.kmers.k() != self.kmer_size {
                record.kmers = record.kmers.rebuild(self.kmer_size);
            }
            self.insert(record);
            copied += 1;
        }
        Ok(copied)
    }

    fn insert(&mut self, record: RepresentativeRecord) {
        self.id_to_index
            .insert(record.id.clone(), self.records.len());
        self.records.push(record);
    }

    /// Load a set from a `.json` or `.bin` artifact
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn load(path: &Path) -> Result<Self, RepSetError> {
        let format = ArtifactFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        let data: RepSetData = match format {
            ArtifactFormat::Json => serde_json::from_slice(&bytes)?,
            ArtifactFormat::Bincode => bincode::deserialize(&bytes)?,
        };
        debug!(
            path = %path.display(),
            representatives = data.representatives.len(),
            "loaded representative set"
        );
        Ok(Self::from_data(data))
    }

    /// Parse a set from JSON text
    ///
    /// # Errors
    ///
    /// Returns `RepSetError::Json` if the text is not a valid artifact.
    pub fn from_json(json: &str) -> Result<Self, RepSetError> {
        let data: RepSetData = serde_json::from_str(json)?;
        Ok(Self::from_data(data))
    }

    fn from_data(data: RepSetData) -> Self {
        // Version check (warn but don't fail)
        if data.version != REPSET_VERSION {
            warn!(
                "Representative set version mismatch (expected {}, found {})",
                REPSET_VERSION, data.version
            );
        }

        let mut set = Self::new(data.marker, data.kmer_size, data.threshold);
        for entry in data.representatives {
            let record = RepresentativeRecord::from_entry(entry, set.kmer_size);
            if !set.contains(&record.id) {
                set.insert(record);
            }
        }
        set
    }

    fn to_data(&self) -> RepSetData {
        RepSetData {
            version: REPSET_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            marker: self.marker.clone(),
            kmer_size: self.kmer_size,
            threshold: self.threshold,
            representatives: self.records.iter().map(RepresentativeRecord::to_entry).collect(),
        }
    }

    /// Export the set to JSON
    ///
    /// # Errors
    ///
    /// Returns `RepSetError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, RepSetError> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    /// Save the set, choosing the encoding from the file extension.
    ///
    /// The artifact is written to a temporary file beside `path` and renamed
    /// into place, so readers never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unknown or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), RepSetError> {
        let format = ArtifactFormat::from_path(path)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let data = self.to_data();
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file_mut());
            match format {
                ArtifactFormat::Json => serde_json::to_writer_pretty(&mut writer, &data)?,
                ArtifactFormat::Bincode => bincode::serialize_into(&mut writer, &data)?,
            }
            writer.flush()?;
        }
        temp.persist(path)?;

        debug!(path = %path.display(), representatives = self.len(), "saved representative set");
        Ok(())
    }
}

/// Sets compare equal when they agree on marker, kmer size, threshold and
/// representative membership (ids and sequences, in order).
impl PartialEq for RepresentativeSet {
    fn eq(&self, other: &Self) -> bool {
        self.marker == other.marker
            && self.kmer_size == other.kmer_size
            && self.threshold == other.threshold
            && self.records.len() == other.records.len()
            && self.records.iter().zip(&other.records).all(|(a, b)| {
                a.id == b.id
                    && a.feature_id == b.feature_id
                    && a.kmers.sequence().residues() == b.kmers.sequence().residues()
            })
    }
}

impl<'a> IntoIterator for &'a RepresentativeSet {
    type Item = &'a RepresentativeRecord;
    type IntoIter = std::slice::Iter<'a, RepresentativeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Save a set to `path`
///
/// # Errors
///
/// See [`RepresentativeSet::save`].
pub fn save(set: &RepresentativeSet, path: &Path) -> Result<(), RepSetError> {
    set.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(n: usize) -> KmerSize {
        KmerSize::new(n).unwrap()
    }

    fn tokens(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{prefix}{i:03}")).collect()
    }

    fn record(id: &str, kmers: Vec<String>) -> RepresentativeRecord {
        RepresentativeRecord::new(
            GenomeId::new(id),
            format!("Genome {id}"),
            format!("fig|{id}.peg.1"),
            KmerSet::from_kmers(id, k(4), kmers),
        )
    }

    const PROT_A: &str = "MSHLAELVASAKAAISQASDVAALDNVRVEYLGKKGHLTLQMTTLRELPPEERPAAGAVINEAKEQVQQALNARKAELESAALNARLAAETIDVSLPGRRIENGGLHPVTRTIDRIESFFGELGFTVATGPEIEDDYHNFDALNIPGHHPARADHDTFWFDTTRLLRTQTSGVQIRTMKAQQPPIRIIAPGRVYRNDYDQTHTPMFHQMEGLIVDTNISFTNLKGTLHDFLRNFFEEDLQIRFRPSYFPFTEPSAEVDVMGKNGKWLEVLGCGMVHPNVLRNVGIDPEVYSGFAFGMGMERLTMLRYGVTDLRSFFENDLRFLKQFK";
    const PROT_B: &str = "MQQLDALVSEALAEIAAAHSLDQLEAVRVKYLGKKGELTALLKSLGQLSPEERPAAGQAINQAKQAIQEALDARKAQLEQAELNAKLAAEKIDVTLPGRRQATGGLHPVTRTIQRVEQFFMQLGFSVAEGPEVENDYYNFEALNIPAHHPARAMHDTFYFDQHTLLRTHTSPVQVRTMAQHKPPIRIIAPGRVYRRDSDATHSPMFHQVEGLLIDQHANFSELKGMLLQFLRAFFQRDIEVRFRPSYFPFVEPGAEVDVQVRGEWLEVLGCGMVHPEVLRNVGYDPETWSGFAFGIGIERLAMLRYGINDIRLLYENDLRFLQQFA";

    #[test]
    fn test_observe_admits_then_covers() {
        let mut set = RepresentativeSet::new("PheS", k(8), 100);
        let first = set.observe(
            GenomeId::new("1.1"),
            "Alpha",
            "fig|1.1.peg.1",
            Sequence::new("p", "", PROT_A),
        );
        assert_eq!(first, Admission::Admitted);

        let second = set.observe(
            GenomeId::new("1.2"),
            "Alpha copy",
            "fig|1.2.peg.1",
            Sequence::new("p", "", PROT_A),
        );
        assert!(matches!(
            second,
            Admission::Covered { ref representative, .. } if representative.as_str() == "1.1"
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_readmitting_same_id_never_mutates() {
        let mut set = RepresentativeSet::new("PheS", k(8), 100);
        set.observe(GenomeId::new("1.1"), "A", "f1", Sequence::new("p", "", PROT_A));
        let again = set.observe(GenomeId::new("1.1"), "A", "f1", Sequence::new("p", "", PROT_A));
        assert!(!again.is_admitted());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut set = RepresentativeSet::new("m", k(4), 3);
        set.observe_record(record("a", tokens("x", 0..10)));
        // Exactly 3 shared kmers: covered
        let mut kmers = tokens("x", 0..3);
        kmers.extend(tokens("y", 0..7));
        assert!(!set.observe_record(record("b", kmers)).is_admitted());
        // Only 2 shared: admitted
        let mut kmers = tokens("x", 0..2);
        kmers.extend(tokens("z", 0..8));
        assert!(set.observe_record(record("c", kmers)).is_admitted());
    }

    #[test]
    fn test_order_dependent_admission_scenario() {
        let a = tokens("a", 0..100);
        let b: Vec<String> = tokens("a", 0..60).into_iter().chain(tokens("b", 0..40)).collect();
        let c: Vec<String> = tokens("a", 0..90).into_iter().chain(tokens("b", 0..35)).collect();

        let mut set = RepresentativeSet::new("m", k(4), 80);
        assert!(set.observe_record(record("A", a)).is_admitted());
        // B shares only 60 with A
        assert!(set.observe_record(record("B", b)).is_admitted());
        // C shares 90 with A and 95 with B; B is the closer one
        assert_eq!(
            set.observe_record(record("C", c)),
            Admission::Covered {
                representative: GenomeId::new("B"),
                similarity: 95
            }
        );

        let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_pairwise_similarity_below_threshold() {
        let mut set = RepresentativeSet::new("PheS", k(4), 40);
        for (i, protein) in [PROT_A, PROT_B, PROT_A, &PROT_B[10..], &PROT_A[50..]]
            .iter()
            .enumerate()
        {
            set.observe(
                GenomeId::new(format!("g{i}")),
                "g",
                "f",
                Sequence::new("p", "", *protein),
            );
        }
        let reps: Vec<_> = set.iter().collect();
        for (i, a) in reps.iter().enumerate() {
            for b in &reps[i + 1..] {
                assert!(a.kmers.similarity(&b.kmers) < set.threshold());
            }
        }
    }

    #[test]
    fn test_absorb_copies_without_admission() {
        let mut prior = RepresentativeSet::new("PheS", k(8), 100);
        prior.observe(GenomeId::new("1.1"), "A", "f1", Sequence::new("p", "", PROT_A));

        // Target already holds an identical sequence under another id
        let mut target = RepresentativeSet::new("PheS", k(6), 10);
        target.observe(GenomeId::new("2.1"), "A2", "f2", Sequence::new("p", "", PROT_A));

        assert_eq!(target.absorb(&prior).unwrap(), 1);
        assert_eq!(target.len(), 2);
        assert_eq!(target.get(&GenomeId::new("1.1")).unwrap().kmers.k(), k(6));

        // Absorbing twice copies nothing new
        assert_eq!(target.absorb(&prior).unwrap(), 0);
    }

    #[test]
    fn test_absorb_rejects_other_marker() {
        let mut target = RepresentativeSet::new("PheS", k(8), 100);
        let other = RepresentativeSet::new("SSU", k(8), 100);
        assert!(matches!(
            target.absorb(&other),
            Err(RepSetError::MarkerMismatch { .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let mut set = RepresentativeSet::new("PheS", k(8), 100);
        set.observe(GenomeId::new("1.1"), "A", "f1", Sequence::new("p", "", PROT_A));
        set.observe(GenomeId::new("1.2"), "B", "f2", Sequence::new("p", "", PROT_B));

        let json = set.to_json().unwrap();
        assert!(json.contains("\"marker\""));
        assert!(json.contains("\"1.2\""));

        let restored = RepresentativeSet::from_json(&json).unwrap();
        assert_eq!(restored, set);
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = RepresentativeSet::new("PheS", k(8), 100);
        set.observe(GenomeId::new("1.1"), "A", "f1", Sequence::new("p", "", PROT_A));
        set.observe(GenomeId::new("1.2"), "B", "f2", Sequence::new("p", "", PROT_B));

        for name in ["rep100.json", "rep100.bin"] {
            let path = dir.path().join(name);
            save(&set, &path).unwrap();
            let loaded = RepresentativeSet::load(&path).unwrap();
            assert_eq!(loaded, set);
            assert_eq!(
                loaded.get(&GenomeId::new("1.1")).unwrap().kmers,
                set.get(&GenomeId::new("1.1")).unwrap().kmers
            );
        }
    }

    #[test]
    fn test_loaded_set_still_admits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rep100.json");
        let mut set = RepresentativeSet::new("PheS", k(8), 100);
        set.observe(GenomeId::new("1.1"), "A", "f1", Sequence::new("p", "", PROT_A));
        set.save(&path).unwrap();

        let mut loaded = RepresentativeSet::load(&path).unwrap();
        let outcome = loaded.observe(GenomeId::new("1.2"), "B", "f2", Sequence::new("p", "", PROT_B));
        assert!(outcome.is_admitted());
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_unknown_extension() {
        let set = RepresentativeSet::new("PheS", k(8), 100);
        assert!(matches!(
            set.save(Path::new("rep100.txt")),
            Err(RepSetError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_zero_threshold_keeps_one_representative() {
        let mut set = RepresentativeSet::new("m", k(3), 0);
        assert!(set
            .observe(GenomeId::new("a"), "", "", Sequence::new("a", "", "AAAAAA"))
            .is_admitted());
        let outcome = set.observe(GenomeId::new("c"), "", "", Sequence::new("c", "", "CCCCCC"));
        assert_eq!(
            outcome,
            Admission::Covered {
                representative: GenomeId::new("a"),
                similarity: 0
            }
        );
        assert_eq!(set.len(), 1);
    }
}
