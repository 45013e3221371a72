//! Representative sets: storage, admission, multi-level builds and persistence.
//!
//! A representative set keeps a genome only if it shares fewer than
//! `threshold` kmers with every representative admitted before it. The result
//! depends on the order candidates are offered in, so callers feed curated
//! genomes in [`admission order`](crate::core::candidate::CandidateRecord::admission_order).
//!
//! ## Artifacts
//!
//! Each level is stored as `rep<threshold>.json` or `rep<threshold>.bin`.
//! A directory of such files is loaded back as a set of levels, and loading
//! restores a set that can keep admitting genomes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use repgen::core::kmers::KmerSize;
//! use repgen::core::sequence::Sequence;
//! use repgen::core::types::GenomeId;
//! use repgen::repset::store::RepresentativeSet;
//! use std::path::Path;
//!
//! let mut set = RepresentativeSet::new("PheS", KmerSize::new(8).unwrap(), 100);
//! let protein = Sequence::new("fig|83333.1.peg.1712", "", "MSHLAELVASAKAAISQASDVAALDNVRVEYLGKKG");
//! set.observe(GenomeId::new("83333.1"), "Escherichia coli K-12", "fig|83333.1.peg.1712", protein);
//! set.save(Path::new("reps/rep100.json")).unwrap();
//! ```

pub mod builder;
pub mod levels;
pub mod store;
