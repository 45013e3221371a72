use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::cli::{truncate, OutputFormat};
use crate::repset::levels::{load_sets, parse_level_file_name};
use crate::repset::store::RepresentativeSet;

#[derive(Args)]
pub struct SetsArgs {
    #[command(subcommand)]
    pub command: SetsCommands,
}

#[derive(Subcommand)]
pub enum SetsCommands {
    /// List the representative sets in a directory
    List {
        /// Directory holding rep<threshold> artifacts
        #[arg(required = true)]
        dir: PathBuf,
    },

    /// Show the representatives of one set
    Show {
        /// A rep<threshold> artifact, or a directory with --threshold
        #[arg(required = true)]
        path: PathBuf,

        /// Threshold level to show when PATH is a directory
        #[arg(short, long)]
        threshold: Option<usize>,

        /// Include the marker sequence of each representative
        #[arg(long)]
        sequences: bool,
    },
}

/// Execute sets subcommand
///
/// # Errors
///
/// Returns an error if the artifacts cannot be read.
pub fn run(args: SetsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        SetsCommands::List { dir } => run_list(&dir, format, verbose),
        SetsCommands::Show {
            path,
            threshold,
            sequences,
        } => run_show(&path, threshold, sequences, format),
    }
}

fn run_list(dir: &std::path::Path, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let sets = load_sets(dir).with_context(|| format!("loading sets from {}", dir.display()))?;

    if verbose {
        eprintln!("Found {} set(s) in {}", sets.len(), dir.display());
    }

    match format {
        OutputFormat::Text => {
            println!("Representative Sets ({})\n", sets.len());
            println!("{:>9} {:<12} {:>4} {:>15}", "Threshold", "Marker", "K", "Representatives");
            println!("{}", "-".repeat(43));
            for set in &sets {
                println!(
                    "{:>9} {:<12} {:>4} {:>15}",
                    set.threshold(),
                    truncate(set.marker(), 12),
                    set.kmer_size(),
                    set.len()
                );
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = sets
                .iter()
                .map(|set| {
                    serde_json::json!({
                        "threshold": set.threshold(),
                        "marker": set.marker(),
                        "kmer_size": set.kmer_size().get(),
                        "representatives": set.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("threshold\tmarker\tkmer_size\trepresentatives");
            for set in &sets {
                println!(
                    "{}\t{}\t{}\t{}",
                    set.threshold(),
                    set.marker(),
                    set.kmer_size(),
                    set.len()
                );
            }
        }
    }

    Ok(())
}

fn run_show(
    path: &std::path::Path,
    threshold: Option<usize>,
    sequences: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let set = if path.is_dir() {
        let threshold =
            threshold.ok_or_else(|| anyhow::anyhow!("--threshold is required when PATH is a directory"))?;
        load_sets(path)?
            .into_iter()
            .find(|s| s.threshold() == threshold)
            .ok_or_else(|| anyhow::anyhow!("no rep{threshold} set in {}", path.display()))?
    } else {
        if parse_level_file_name(path).is_none() {
            tracing::warn!("{} does not follow the rep<threshold> naming", path.display());
        }
        RepresentativeSet::load(path).with_context(|| format!("loading {}", path.display()))?
    };

    match format {
        OutputFormat::Text => {
            println!("Representative Set: {} (rep{})\n", set.marker(), set.threshold());
            println!("Marker:          {}", set.marker());
            println!("Threshold:       {}", set.threshold());
            println!("Kmer size:       {}", set.kmer_size());
            println!("Representatives: {}", set.len());
            println!("\n{:<16} {:<28} {:>8} Name", "ID", "Feature", "Kmers");
            println!("{}", "-".repeat(80));
            for r in &set {
                println!(
                    "{:<16} {:<28} {:>8} {}",
                    r.id.as_str(),
                    truncate(&r.feature_id, 28),
                    r.kmers.len(),
                    r.name
                );
                if sequences {
                    println!("  {}", r.kmers.sequence().residues());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", set.to_json()?);
        }
        OutputFormat::Tsv => {
            if sequences {
                println!("id\tfeature_id\tkmers\tname\tsequence");
            } else {
                println!("id\tfeature_id\tkmers\tname");
            }
            for r in &set {
                if sequences {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        r.id,
                        r.feature_id,
                        r.kmers.len(),
                        r.name,
                        r.kmers.sequence().residues()
                    );
                } else {
                    println!("{}\t{}\t{}\t{}", r.id, r.feature_id, r.kmers.len(), r.name);
                }
            }
        }
    }

    Ok(())
}
