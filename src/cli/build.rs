use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::core::candidate::CandidateRecord;
use crate::core::kmers::{KmerSize, DEFAULT_PROTEIN_KMER};
use crate::core::types::{GenomeId, QualityRating};
use crate::parsing::fasta;
use crate::repset::builder::RepSetBuilder;
use crate::repset::levels::RepresentativeLevels;
use crate::repset::store::ArtifactFormat;

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ArtifactFormatArg {
    #[default]
    Json,
    Bin,
}

impl From<ArtifactFormatArg> for ArtifactFormat {
    fn from(arg: ArtifactFormatArg) -> Self {
        match arg {
            ArtifactFormatArg::Json => ArtifactFormat::Json,
            ArtifactFormatArg::Bin => ArtifactFormat::Bincode,
        }
    }
}

#[derive(Args)]
pub struct BuildArgs {
    /// Curated genomes (JSON written by `repgen curate --output`)
    #[arg(long, conflicts_with = "fasta", required_unless_present = "fasta")]
    pub candidates: Option<PathBuf>,

    /// Marker proteins (FASTA); each record is one genome, offered in file order
    #[arg(long)]
    pub fasta: Option<PathBuf>,

    /// Similarity thresholds (shared kmers), one set per threshold
    #[arg(
        short,
        long = "threshold",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "10,25,50,100,200"
    )]
    pub thresholds: Vec<usize>,

    /// Protein kmer size
    #[arg(short, long, default_value_t = DEFAULT_PROTEIN_KMER)]
    pub kmer: usize,

    /// Marker name recorded in the artifacts
    #[arg(long, default_value = "PheS")]
    pub marker: String,

    /// Only admit curated genomes rated at least this
    #[arg(long, value_parser = parse_rating)]
    pub min_rating: Option<QualityRating>,

    /// Directory of a previous build whose representatives are kept
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Artifact encoding
    #[arg(long, value_enum, default_value = "json")]
    pub encoding: ArtifactFormatArg,

    /// Output directory for rep<threshold> artifacts
    #[arg(short, long, required = true)]
    pub output: PathBuf,

    /// Write per-level memberships (TSV)
    #[arg(long)]
    pub memberships: Option<PathBuf>,
}

fn parse_rating(s: &str) -> Result<QualityRating, String> {
    QualityRating::parse(s).ok_or_else(|| format!("unknown rating '{s}'"))
}

/// Execute build subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be read, a seed level indexes a
/// different marker, or the artifacts cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: BuildArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let kmer_size = KmerSize::new(args.kmer)?;
    if args.thresholds.is_empty() {
        anyhow::bail!("at least one threshold is required");
    }

    let mut levels = RepresentativeLevels::with_thresholds(&args.marker, kmer_size, &args.thresholds);
    if let Some(seed_dir) = &args.seed {
        let prior = RepresentativeLevels::load_dir(seed_dir)
            .with_context(|| format!("loading seed sets from {}", seed_dir.display()))?;
        let copied = levels.seed_from(&prior)?;
        if verbose {
            eprintln!("Seeded {copied} representative(s) from {}", seed_dir.display());
        }
    }

    let mut builder = RepSetBuilder::new(levels);
    if let Some(path) = &args.candidates {
        let mut candidates = read_candidates(path)?;
        if let Some(minimum) = args.min_rating {
            candidates.retain(|c| c.rating.is_some_and(|r| r.meets(minimum)));
        }
        candidates.sort_by(CandidateRecord::admission_order);
        if verbose {
            eprintln!("Offering {} curated genome(s)", candidates.len());
        }
        builder.add_candidates(&candidates);
    } else if let Some(path) = &args.fasta {
        let proteins = fasta::read_sequences(path)
            .with_context(|| format!("reading {}", path.display()))?;
        if verbose {
            eprintln!("Offering {} protein(s) from {}", proteins.len(), path.display());
        }
        for protein in &proteins {
            let id = GenomeId::new(protein.label());
            builder.add_sequence(&id, protein.comment(), protein.label(), protein);
        }
    }

    if let Some(path) = &args.memberships {
        write_memberships(&builder, path)?;
    }

    let summary = builder.summary();
    let written = builder.finish().save_dir(&args.output, args.encoding.into())?;

    match format {
        OutputFormat::Text => {
            print!("{summary}");
            println!("\nWrote {} artifact(s) to {}", written.len(), args.output.display());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "summary": summary,
                "artifacts": written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("threshold\trepresentatives\tadmitted\tcovered");
            for level in &summary.levels {
                println!(
                    "{}\t{}\t{}\t{}",
                    level.threshold, level.representatives, level.admitted, level.covered
                );
            }
        }
    }

    Ok(())
}

fn read_candidates(path: &Path) -> anyhow::Result<Vec<CandidateRecord>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let candidates = serde_json::from_str(&text)
        .with_context(|| format!("parsing curated genomes {}", path.display()))?;
    Ok(candidates)
}

fn write_memberships(builder: &RepSetBuilder, path: &Path) -> anyhow::Result<()> {
    use std::fmt::Write as _;

    let mut out = String::from("genome\tthreshold\trepresentative\tsimilarity\tadmitted\n");
    for m in builder.memberships() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            m.genome, m.threshold, m.representative, m.similarity, m.admitted
        )?;
    }
    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
