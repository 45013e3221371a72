use serde::{Deserialize, Serialize};

/// Unique identifier for a genome (e.g. `83333.1`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenomeId(pub String);

impl GenomeId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GenomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GenomeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Numeric taxonomy identifier
pub type TaxonId = u32;

/// Taxonomic domain of a genome
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    Bacteria,
    Archaea,
    Other(String),
}

impl Domain {
    /// Map a domain-level taxon name onto a domain
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "bacteria" => Self::Bacteria,
            "archaea" => Self::Archaea,
            _ => Self::Other(name.trim().to_string()),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bacteria => write!(f, "Bacteria"),
            Self::Archaea => write!(f, "Archaea"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Quality rating of a curated genome.
///
/// The order is defined once by [`QualityRating::RANKED`] (best first) and
/// all comparisons go through [`QualityRating::rank`], so reordering the
/// variant declarations never changes the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRating {
    /// Flagged upstream as a reference genome
    Reference,
    /// Flagged upstream as a representative genome
    Representative,
    /// Fully validated
    Normal,
    /// Only one secondary-marker sequence and nothing to confirm it against
    SingleSsu,
    /// Secondary marker present but shorter than a full-length copy
    ShortSsu,
    /// Secondary marker is contradictory or unusable
    BadSsu,
}

impl QualityRating {
    /// All ratings, best first
    pub const RANKED: [QualityRating; 6] = [
        Self::Reference,
        Self::Representative,
        Self::Normal,
        Self::SingleSsu,
        Self::ShortSsu,
        Self::BadSsu,
    ];

    /// Position in [`Self::RANKED`]; lower is better
    #[must_use]
    pub fn rank(self) -> usize {
        Self::RANKED
            .iter()
            .position(|&r| r == self)
            .unwrap_or(Self::RANKED.len())
    }

    /// True if this rating is at least as good as `minimum`
    #[must_use]
    pub fn meets(self, minimum: QualityRating) -> bool {
        self.rank() <= minimum.rank()
    }

    /// Stable name used for statistics keys and reports
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Representative => "representative",
            Self::Normal => "normal",
            Self::SingleSsu => "single-ssu",
            Self::ShortSsu => "short-ssu",
            Self::BadSsu => "bad-ssu",
        }
    }

    /// Parse a rating from its stable name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase().replace('_', "-");
        Self::RANKED.into_iter().find(|r| r.name() == s)
    }

    /// Parse the upstream reference flag (`Reference`, `Representative`)
    #[must_use]
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_lowercase().as_str() {
            "reference" => Some(Self::Reference),
            "representative" => Some(Self::Representative),
            _ => None,
        }
    }
}

impl PartialOrd for QualityRating {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ratings compare by rank: `Reference < Normal < BadSsu`, so sorting
/// ascending puts the best genomes first.
impl Ord for QualityRating {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for QualityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_order_best_first() {
        let mut ratings = vec![
            QualityRating::BadSsu,
            QualityRating::Normal,
            QualityRating::Reference,
            QualityRating::ShortSsu,
            QualityRating::SingleSsu,
            QualityRating::Representative,
        ];
        ratings.sort();
        assert_eq!(ratings, QualityRating::RANKED.to_vec());
    }

    #[test]
    fn test_rating_meets_minimum() {
        assert!(QualityRating::Reference.meets(QualityRating::Normal));
        assert!(QualityRating::Normal.meets(QualityRating::Normal));
        assert!(!QualityRating::ShortSsu.meets(QualityRating::SingleSsu));
    }

    #[test]
    fn test_rating_parse_round_trip() {
        for rating in QualityRating::RANKED {
            assert_eq!(QualityRating::parse(rating.name()), Some(rating));
        }
        assert_eq!(QualityRating::parse("short_ssu"), Some(QualityRating::ShortSsu));
        assert_eq!(QualityRating::parse("excellent"), None);
    }

    #[test]
    fn test_rating_from_flag() {
        assert_eq!(
            QualityRating::from_flag("Reference"),
            Some(QualityRating::Reference)
        );
        assert_eq!(
            QualityRating::from_flag(" representative "),
            Some(QualityRating::Representative)
        );
        assert_eq!(QualityRating::from_flag(""), None);
    }

    #[test]
    fn test_domain_from_name() {
        assert_eq!(Domain::from_name("Archaea"), Domain::Archaea);
        assert_eq!(Domain::from_name("bacteria"), Domain::Bacteria);
        assert_eq!(
            Domain::from_name("Eukaryota"),
            Domain::Other("Eukaryota".to_string())
        );
    }
}
