//! Several representative sets built from one candidate stream, one per
//! threshold, persisted as `rep<threshold>.<ext>` in a shared directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::kmers::KmerSize;
use crate::core::sequence::Sequence;
use crate::core::types::GenomeId;
use crate::matching::nearest::{NearestRepresentativeQuery, Representation};
use crate::repset::store::{Admission, ArtifactFormat, RepSetError, RepresentativeSet};

/// Artifact file name for a threshold level
#[must_use]
pub fn level_file_name(threshold: usize, format: ArtifactFormat) -> String {
    format!("rep{threshold}.{}", format.extension())
}

/// Parse the threshold out of a `rep<threshold>.<ext>` file name
#[must_use]
pub fn parse_level_file_name(path: &Path) -> Option<usize> {
    ArtifactFormat::from_path(path).ok()?;
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix("rep")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Representative sets keyed by threshold
#[derive(Debug, Clone, Default)]
pub struct RepresentativeLevels {
    sets: BTreeMap<usize, RepresentativeSet>,
}

impl RepresentativeLevels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one empty set per threshold, all for the same marker and kmer size
    #[must_use]
    pub fn with_thresholds(marker: &str, kmer_size: KmerSize, thresholds: &[usize]) -> Self {
        let mut levels = Self::new();
        for &threshold in thresholds {
            levels.insert(RepresentativeSet::new(marker, kmer_size, threshold));
        }
        levels
    }

    /// Add a set, replacing any existing set at the same threshold
    pub fn insert(&mut self, set: RepresentativeSet) -> Option<RepresentativeSet> {
        self.sets.insert(set.threshold(), set)
    }

    #[must_use]
    pub fn get(&self, threshold: usize) -> Option<&RepresentativeSet> {
        self.sets.get(&threshold)
    }

    pub fn get_mut(&mut self, threshold: usize) -> Option<&mut RepresentativeSet> {
        self.sets.get_mut(&threshold)
    }

    /// Take the set at `threshold` out of the collection
    pub fn remove(&mut self, threshold: usize) -> Option<RepresentativeSet> {
        self.sets.remove(&threshold)
    }

    /// Thresholds in ascending order
    pub fn thresholds(&self) -> impl Iterator<Item = usize> + '_ {
        self.sets.keys().copied()
    }

    /// Sets in ascending threshold order
    pub fn iter(&self) -> impl Iterator<Item = &RepresentativeSet> {
        self.sets.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Offer one genome to every level, lowest threshold first
    pub fn observe(
        &mut self,
        id: &GenomeId,
        name: &str,
        feature_id: &str,
        sequence: &Sequence,
    ) -> Vec<(usize, Admission)> {
        self.sets
            .iter_mut()
            .map(|(&threshold, set)| {
                let outcome = set.observe(id.clone(), name, feature_id, sequence.clone());
                (threshold, outcome)
            })
            .collect()
    }

    /// Look up the nearest representative at every level
    #[must_use]
    pub fn classify(&self, sequence: &Sequence) -> Vec<Representation> {
        self.sets
            .values()
            .map(|set| NearestRepresentativeQuery::new(set).find_sequence(sequence.clone()))
            .collect()
    }

    /// Load every `rep<threshold>.json|bin` artifact in `dir`.
    ///
    /// Files not following the naming convention are ignored. When both
    /// encodings exist for one threshold the JSON artifact wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or an artifact is invalid.
    pub fn load_dir(dir: &Path) -> Result<Self, RepSetError> {
        let mut paths: Vec<(usize, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(threshold) = parse_level_file_name(&path) {
                paths.push((threshold, path));
            }
        }
        // Sort so ".bin" loads before ".json" and JSON replaces it
        paths.sort();

        let mut levels = Self::new();
        for (_, path) in paths {
            let set = RepresentativeSet::load(&path)?;
            levels.insert(set);
        }

        info!(
            "Loaded {} representative set level(s) from {}",
            levels.len(),
            dir.display()
        );
        Ok(levels)
    }

    /// Save every level into `dir` (created if needed), returning the paths written
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or any artifact cannot be written.
    pub fn save_dir(&self, dir: &Path, format: ArtifactFormat) -> Result<Vec<PathBuf>, RepSetError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.sets.len());
        for (&threshold, set) in &self.sets {
            let path = dir.join(level_file_name(threshold, format));
            set.save(&path)?;
            written.push(path);
        }
        info!("Saved {} representative set level(s) to {}", written.len(), dir.display());
        Ok(written)
    }

    /// Seed each level with the representatives of the matching level in
    /// `prior`, so they are retained in the next run. Returns records copied.
    ///
    /// # Errors
    ///
    /// Returns `RepSetError::MarkerMismatch` if a prior level indexes another marker.
    pub fn seed_from(&mut self, prior: &RepresentativeLevels) -> Result<usize, RepSetError> {
        let mut copied = 0;
        for (threshold, set) in &mut self.sets {
            if let Some(source) = prior.get(*threshold) {
                copied += set.absorb(source)?;
            }
        }
        Ok(copied)
    }
}

/// Load every level found in `dir`, lowest threshold first
///
/// # Errors
///
/// See [`RepresentativeLevels::load_dir`].
pub fn load_sets(dir: &Path) -> Result<Vec<RepresentativeSet>, RepSetError> {
    Ok(RepresentativeLevels::load_dir(dir)?.sets.into_values().collect())
}
