use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod curation;
mod matching;
mod parsing;
mod repset;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("repgen=debug,info")
    } else {
        EnvFilter::new("repgen=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Curate(args) => {
            cli::curate::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Build(args) => {
            cli::build::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Classify(args) => {
            cli::classify::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Sets(args) => {
            cli::sets::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
