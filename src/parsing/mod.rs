//! Parsers for the files a curation run reads.
//!
//! - **FASTA** (plain or gzip): marker sequences for building and
//!   classification, and the sequence table of a provider dump
//! - **Genome lists** (TSV/CSV): genome id, name, lineage, quality score and
//!   optional reference flag for curation input
//!
//! ## Example
//!
//! ```rust,no_run
//! use repgen::parsing::{fasta, tsv};
//! use std::path::Path;
//!
//! let proteins = fasta::read_sequences(Path::new("phes.faa")).unwrap();
//! let genomes = tsv::parse_genome_list_file(Path::new("genomes.tsv"), '\t').unwrap();
//! ```

use thiserror::Error;

pub mod fasta;
pub mod tsv;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Too many records: {0} exceeds maximum allowed")]
    TooManyRecords(usize),
}
