use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::parsing::fasta;
use crate::repset::levels::RepresentativeLevels;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Marker proteins to classify (FASTA, optionally gzipped)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory holding rep<threshold> artifacts
    #[arg(long, required = true)]
    pub sets: PathBuf,
}

/// Execute classify subcommand
///
/// # Errors
///
/// Returns an error if the proteins or the sets cannot be read.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ClassifyArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let levels = RepresentativeLevels::load_dir(&args.sets)
        .with_context(|| format!("loading sets from {}", args.sets.display()))?;
    if levels.is_empty() {
        anyhow::bail!("no rep<threshold> artifacts found in {}", args.sets.display());
    }

    let proteins = fasta::read_sequences(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if verbose {
        let thresholds: Vec<String> = levels.thresholds().map(|t| t.to_string()).collect();
        eprintln!(
            "Classifying {} protein(s) at threshold(s) {}",
            proteins.len(),
            thresholds.join(", ")
        );
    }

    let results: Vec<_> = proteins
        .iter()
        .map(|protein| (protein.label(), levels.classify(protein)))
        .collect();

    match format {
        OutputFormat::Text => {
            for (i, (label, reps)) in results.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{label}");
                for rep in reps {
                    let status = if rep.is_covered() { "covered" } else { "new" };
                    println!(
                        "  rep{:<6} {:<20} similarity {:>5}  distance {:.3}  {status}",
                        rep.threshold,
                        rep.representative.as_ref().map_or("-", |id| id.as_str()),
                        rep.similarity,
                        rep.distance,
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = results
                .iter()
                .map(|(label, reps)| {
                    serde_json::json!({
                        "query": label,
                        "levels": reps.iter().map(|r| serde_json::json!({
                            "threshold": r.threshold,
                            "representative": r.representative,
                            "similarity": r.similarity,
                            "distance": r.distance,
                            "covered": r.is_covered(),
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("query\tthreshold\trepresentative\tsimilarity\tdistance\tcovered");
            for (label, reps) in &results {
                for rep in reps {
                    println!(
                        "{}\t{}\t{}\t{}\t{:.4}\t{}",
                        label,
                        rep.threshold,
                        rep.representative.as_ref().map_or("", |id| id.as_str()),
                        rep.similarity,
                        rep.distance,
                        rep.is_covered()
                    );
                }
            }
        }
    }

    Ok(())
}
