//! Curation of candidate genomes before representative set construction.
//!
//! [`GenomeQualityCurator`](curator::GenomeQualityCurator) resolves and
//! rates each genome's marker sequences through a
//! [`SequenceProvider`](provider::SequenceProvider). Sequences are fetched by
//! content hash in deduplicated batches ([`HashBatchCache`](cache::HashBatchCache)),
//! and every removal or rating is counted in [`Statistics`](stats::Statistics).

pub mod cache;
pub mod curator;
pub mod provider;
pub mod secondary;
pub mod stats;
