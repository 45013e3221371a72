//! # repgen
//!
//! A library for curating bacterial genomes and selecting representative
//! genomes by marker-protein kmer similarity.
//!
//! Large genome collections contain many near-identical organisms. `repgen`
//! reduces such a collection to a set of representatives that share fewer
//! than `threshold` kmers of a conserved marker protein (by default the
//! phenylalanyl-tRNA synthetase alpha chain, PheS) with each other, after
//! rating every genome's data quality through its 16S SSU rRNA copies.
//!
//! ## Features
//!
//! - **Kmer similarity**: shared-kmer counts and Jaccard distance
//! - **Greedy admission**: order-dependent, deterministic representative sets
//! - **Multiple levels**: one candidate stream feeds sets at several thresholds
//! - **Curation**: deduplicated batch fetching, role verification, SSU
//!   cross-validation and genus-consensus retry
//! - **Persistence**: `rep<threshold>.json|bin` artifacts that can be reloaded
//!   and extended
//!
//! ## Example
//!
//! ```rust,no_run
//! use repgen::curation::curator::{curate_candidates, CurationConfig};
//! use repgen::curation::provider::DumpProvider;
//! use repgen::parsing::tsv::parse_genome_list_file;
//! use repgen::repset::builder::build_representative_set;
//! use std::path::Path;
//!
//! let provider = DumpProvider::load(Path::new("dump")).unwrap();
//! let genomes = parse_genome_list_file(Path::new("genomes.tsv"), '\t').unwrap();
//! let config = CurationConfig::default();
//! let k = config.kmers.protein;
//!
//! let (candidates, stats) = curate_candidates(&provider, &genomes, config).unwrap();
//! let set = build_representative_set(&candidates, "PheS", 100, k);
//! println!("{} representatives\n{stats}", set.len());
//! ```
//!
//! ## Modules
//!
//! - [`core`]: sequences, kmer sets, candidate records and quality ratings
//! - [`repset`]: representative sets, levels, builder and persistence
//! - [`matching`]: nearest-representative lookup
//! - [`curation`]: the multi-phase genome curation pipeline
//! - [`parsing`]: FASTA and genome list parsers
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod curation;
pub mod matching;
pub mod parsing;
pub mod repset;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::kmers::{KmerConfig, KmerSet, KmerSize};
pub use core::sequence::Sequence;
pub use core::types::*;
pub use curation::curator::{curate_candidates, CurationConfig, GenomeQualityCurator};
pub use matching::nearest::{query_nearest, Representation};
pub use repset::builder::build_representative_set;
pub use repset::levels::load_sets;
pub use repset::store::{save, Admission, RepresentativeSet};
