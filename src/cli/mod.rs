//! Command-line interface for repgen.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **curate**: Resolve and rate the marker sequences of a genome list
//! - **build**: Build representative sets at one or more thresholds
//! - **classify**: Find the nearest representative of proteins at every level
//! - **sets**: List or show persisted representative sets
//!
//! ## Usage
//!
//! ```text
//! # Curate a genome list against a provider dump
//! repgen curate genomes.tsv --provider dump/ --output curated.json
//!
//! # Build sets at three thresholds from the curated genomes
//! repgen build --candidates curated.json -t 10,50,100 -o reps/
//!
//! # Extend a previous run, keeping its representatives
//! repgen build --candidates curated.json -t 10,50,100 --seed old_reps/ -o reps/
//!
//! # Classify new proteins
//! repgen classify new_phes.faa --sets reps/ --format tsv
//! ```

use clap::{Parser, Subcommand};

pub mod build;
pub mod classify;
pub mod curate;
pub mod sets;

#[derive(Parser)]
#[command(name = "repgen")]
#[command(version)]
#[command(about = "Curate genomes and select representatives by marker kmer similarity")]
#[command(
    long_about = "repgen selects representative genomes from a large collection.\n\nGenomes are first curated: the primary marker (PheS) and secondary marker (16S SSU rRNA) are resolved, validated and rated. Curated genomes are then admitted greedily into representative sets where no two representatives share `threshold` or more marker kmers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Curate a genome list and rate each genome's marker sequences
    Curate(curate::CurateArgs),

    /// Build representative sets
    Build(build::BuildArgs),

    /// Find the nearest representatives of marker proteins
    Classify(classify::ClassifyArgs),

    /// Inspect persisted representative sets
    Sets(sets::SetsArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Truncate a display string to `width` characters
pub(crate) fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}
