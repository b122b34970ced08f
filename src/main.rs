//! factloop CLI: replay rule files, saturate a graph, or query it.

use anyhow::Context;
use clap::{Parser, Subcommand};
use factloop::{Engine, EngineConfig, RunReport};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "factloop", version = env!("CARGO_PKG_VERSION"), about = "Rule engine that saturates an RDF graph through native algorithms")]
struct Cli {
    /// Engine configuration (TOML). Defaults apply when the file is absent.
    #[arg(short, long, default_value = "factloop.toml")]
    config: PathBuf,

    /// Work directory holding the saved graph and memory cells
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Turtle ontology loaded before the saved graph
    #[arg(short, long)]
    ontology: Option<PathBuf>,

    /// Extra Turtle files merged into the graph before the command runs
    #[arg(short, long)]
    data: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run each combined query of a file once, in order
    Replay { file: PathBuf },
    /// Run every algorithm and classification the ontology describes until nothing changes
    Saturate,
    /// Print the rows of a SELECT query
    Select { query: String },
    /// Estimate the minimum distance between every pair of patches
    Distances,
}

fn print_report(report: &RunReport) -> anyhow::Result<()> {
    print!("{}", report.to_yaml()?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factloop=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(workdir) = cli.workdir {
        config.paths.workdir = workdir;
    }
    if let Some(ontology) = cli.ontology {
        config.paths.ontology = Some(ontology);
    }

    let engine = Engine::open(config)?;
    for file in &cli.data {
        engine
            .load_turtle_file(file)
            .with_context(|| format!("loading {}", file.display()))?;
    }

    match cli.command {
        Command::Replay { file } => {
            let report = engine.replay_file(&file)?;
            print_report(&report)?;
            engine.save()?;
        }
        Command::Saturate => {
            let report = engine.saturate()?;
            print_report(&report)?;
            engine.save()?;
        }
        Command::Select { query } => {
            print!("{}", engine.select_as_text(&query)?);
        }
        Command::Distances => {
            let report = engine.estimate_patch_distances().await?;
            print_report(&report)?;
            engine.save()?;
        }
    }

    info!("done");
    Ok(())
}
