use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::types::{Domain, TaxonId};

/// Genetic code assumed when the species record does not carry one
pub const DEFAULT_GENETIC_CODE: u8 = 11;

/// A single taxonomy node as returned by the data provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    pub id: TaxonId,
    pub name: String,
    /// Rank name, e.g. "genus", "species", "superkingdom"
    pub rank: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genetic_code: Option<u8>,
}

/// The classification fields a curated genome needs from its lineage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    pub genus: Option<TaxonId>,
    pub species: Option<TaxonId>,
    pub domain: Domain,
    pub genetic_code: u8,
}

impl Lineage {
    /// Resolve a lineage (list of taxon ids, root first) against known taxa.
    ///
    /// Ids missing from `taxonomy` are ignored. The domain stays at the
    /// default unless a `superkingdom`/`domain` entry is present.
    #[must_use]
    pub fn resolve(ids: &[TaxonId], taxonomy: &HashMap<TaxonId, TaxonRecord>) -> Self {
        let mut lineage = Self {
            genus: None,
            species: None,
            domain: Domain::default(),
            genetic_code: DEFAULT_GENETIC_CODE,
        };

        for taxon in ids.iter().filter_map(|id| taxonomy.get(id)) {
            match taxon.rank.to_lowercase().as_str() {
                "superkingdom" | "domain" => lineage.domain = Domain::from_name(&taxon.name),
                "genus" => lineage.genus = Some(taxon.id),
                "species" => {
                    lineage.species = Some(taxon.id);
                    if let Some(code) = taxon.genetic_code {
                        lineage.genetic_code = code;
                    }
                }
                _ => {}
            }
        }

        lineage
    }
}
