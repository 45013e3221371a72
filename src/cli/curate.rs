use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::cli::{truncate, OutputFormat};
use crate::core::candidate::CandidateRecord;
use crate::core::kmers::KmerSize;
use crate::core::types::QualityRating;
use crate::curation::curator::{CurationConfig, GenomeQualityCurator};
use crate::curation::provider::DumpProvider;
use crate::curation::stats::Statistics;
use crate::parsing;
use crate::utils::count_to_f64;

#[derive(Args)]
pub struct CurateArgs {
    /// Genome list (TSV or CSV): id, name, lineage, score, [flag]
    #[arg(required = true)]
    pub genomes: PathBuf,

    /// Provider dump directory (taxonomy.json, features.json, sequences.fa[.gz])
    #[arg(long, required = true)]
    pub provider: PathBuf,

    /// JSON curation config; individual flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Distinct sequence hashes per fetch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Protein kmer size
    #[arg(long)]
    pub protein_kmer: Option<usize>,

    /// DNA kmer size
    #[arg(long)]
    pub dna_kmer: Option<usize>,

    /// Drop genomes rated below this (reference, representative, normal,
    /// single-ssu, short-ssu, bad-ssu)
    #[arg(long, value_parser = parse_rating)]
    pub min_rating: Option<QualityRating>,

    /// Write curated genomes (JSON, admission order) for `repgen build`
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write run statistics (JSON if the path ends in .json, else TSV)
    #[arg(long)]
    pub stats: Option<PathBuf>,
}

fn parse_rating(s: &str) -> Result<QualityRating, String> {
    QualityRating::parse(s).ok_or_else(|| format!("unknown rating '{s}'"))
}

/// Execute curate subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be read, the configuration is
/// invalid, or the provider fails.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CurateArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let delimiter = if args.genomes.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
        ','
    } else {
        '\t'
    };
    let genomes = parsing::tsv::parse_genome_list_file(&args.genomes, delimiter)
        .with_context(|| format!("reading genome list {}", args.genomes.display()))?;
    let provider = DumpProvider::load(&args.provider)
        .with_context(|| format!("loading provider dump {}", args.provider.display()))?;

    if verbose {
        eprintln!("Read {} genome(s) from {}", genomes.len(), args.genomes.display());
    }

    let mut curator = GenomeQualityCurator::new(&provider, config)?;
    curator.run(&genomes)?;

    let mut stats = Statistics::new();
    if let Some(minimum) = args.min_rating {
        curator.prune(minimum, &mut stats);
    }
    let (candidates, curation_stats) = curator.into_parts();
    stats.merge(&curation_stats);

    if let Some(path) = &args.output {
        write_candidates(&candidates, path)?;
        if verbose {
            eprintln!("Wrote {} curated genome(s) to {}", candidates.len(), path.display());
        }
    }
    if let Some(path) = &args.stats {
        write_stats(&stats, path)?;
    }

    match format {
        OutputFormat::Text => print_text(&candidates, &stats, genomes.len()),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "genomes": candidates,
                "statistics": stats,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("id\tname\trating\tscore\tgenus\tspecies\tprimary_feature\tprotein_length\tsecondary_copies\tsecondary_length");
            for c in &candidates {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    c.id,
                    c.name,
                    c.rating.map_or("unrated", QualityRating::name),
                    c.score,
                    c.genus.map(|g| g.to_string()).unwrap_or_default(),
                    c.species,
                    c.primary_feature.as_deref().unwrap_or(""),
                    c.primary_protein.as_ref().map_or(0, String::len),
                    c.secondary_count,
                    c.secondary.as_ref().map_or(0, String::len),
                );
            }
        }
    }

    Ok(())
}

fn load_config(args: &CurateArgs) -> anyhow::Result<CurationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => CurationConfig::default(),
    };

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(k) = args.protein_kmer {
        config.kmers.protein = KmerSize::new(k)?;
    }
    if let Some(k) = args.dna_kmer {
        config.kmers.dna = KmerSize::new(k)?;
    }
    Ok(config)
}

/// Write curated genomes as a JSON array
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_candidates(candidates: &[CandidateRecord], path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(candidates)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_stats(stats: &Statistics, path: &Path) -> anyhow::Result<()> {
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let body = if is_json {
        stats.to_json()?
    } else {
        stats.to_string()
    };
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn print_text(candidates: &[CandidateRecord], stats: &Statistics, total: usize) {
    let kept_pct = if total == 0 {
        0.0
    } else {
        100.0 * count_to_f64(candidates.len()) / count_to_f64(total)
    };
    println!(
        "Curated Genomes ({} of {total} kept, {kept_pct:.0}%)\n",
        candidates.len()
    );

    let id_width = candidates
        .iter()
        .map(|c| c.id.as_str().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let name_width = 40;

    println!(
        "{:<id_w$} {:<name_w$} {:<14} {:>8}",
        "ID",
        "Name",
        "Rating",
        "Score",
        id_w = id_width,
        name_w = name_width
    );
    println!("{}", "-".repeat(id_width + name_width + 14 + 8 + 3));
    for c in candidates {
        println!(
            "{:<id_w$} {:<name_w$} {:<14} {:>8.2}",
            c.id.as_str(),
            truncate(&c.name, name_width),
            c.rating.map_or("unrated", QualityRating::name),
            c.score,
            id_w = id_width,
            name_w = name_width
        );
    }

    if !stats.is_empty() {
        println!("\nStatistics:");
        for (key, n) in stats.iter() {
            println!("  {key:<32} {n}");
        }
    }
}
