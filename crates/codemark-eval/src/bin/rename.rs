//! Rename-attack binary.
//!
//! Applies the identifier rename attack to one source file and writes the
//! attacked copy next to it (or to an explicit output path). The default
//! output name encodes the strategy and ratio, e.g.
//! `sample_renamed_random_50.py`.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use codemark_attack::{derived_output_path, Renamer};
use codemark_core::{RenameStrategy, Result};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "rename", about = "Identifier rename attack tool")]
struct Cli {
    /// Source file to attack.
    #[arg(long)]
    input: PathBuf,

    /// Output path. Defaults to `<stem>_renamed_<strategy>_<ratio*100>.<ext>`
    /// next to the input.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Naming strategy: random, sequential, obfuscate.
    #[arg(long, default_value = "random")]
    strategy: RenameStrategy,

    /// Fraction of renamable identifiers to rename.
    #[arg(long, default_value_t = 1.0)]
    ratio: f64,

    /// RNG seed for subset selection and generated names.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// File holding a protected prompt prefix whose identifiers must
    /// survive and whose text is restored verbatim.
    #[arg(long)]
    protected_prefix: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        error!(%error, "rename attack failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.input)?;
    let protected = match &cli.protected_prefix {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };

    let renamer = Renamer::new(cli.strategy, cli.ratio, cli.seed)?;
    let result = renamer.rename(&source, protected.as_deref())?;

    let output = cli
        .output
        .unwrap_or_else(|| derived_output_path(&cli.input, cli.strategy, cli.ratio));
    fs::write(&output, &result.code)?;

    info!(
        input = %cli.input.display(),
        output = %output.display(),
        strategy = %cli.strategy,
        ratio = cli.ratio,
        renamed = result.mapping.len(),
        "wrote attacked file"
    );
    Ok(())
}
