//! Core data types for representative genome selection.
//!
//! - [`Sequence`](sequence::Sequence): labelled residues, immutable once built
//! - [`KmerSet`](kmers::KmerSet): the distinct kmers of a sequence, with
//!   similarity (shared kmers) and Jaccard distance
//! - [`CandidateRecord`](candidate::CandidateRecord): a genome moving through curation
//! - [`QualityRating`](types::QualityRating): ranked quality classes
//!
//! ## Kmer sizes
//!
//! The kmer size is part of every [`KmerSet`](kmers::KmerSet) and never
//! changes after it is built. Protein and nucleotide sizes are configured
//! separately through [`KmerConfig`](kmers::KmerConfig):
//!
//! | Alphabet | Default k |
//! |----------|-----------|
//! | Protein  | 8         |
//! | DNA      | 12        |

pub mod candidate;
pub mod kmers;
pub mod sequence;
pub mod taxonomy;
pub mod types;
