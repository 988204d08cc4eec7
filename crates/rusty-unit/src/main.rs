use anyhow::Result;
use clap::{Parser, Subcommand};
use rusty_unit::{commands, AppConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with a `[runner]` table and a `seed`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the generated test module with coverage and print line/region percentages
    Coverage {
        /// Root of the crate under test
        crate_dir: PathBuf,
        /// Feature list passed to cargo (overrides RU_FEATURES)
        #[arg(long)]
        features: Option<String>,
        /// Directory for tests.log and tests.error (overrides RU_OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Run number (overrides RU_RUN)
        #[arg(long)]
        run: Option<u32>,
    },
    /// Decode a trace file into per-test block distances
    Decode {
        trace_file: PathBuf,
    },
    /// Build the type context from analyzer output and list discovered types
    Types {
        callables: PathBuf,
        /// Shuffle seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_unit=info,synthesis=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Coverage {
            crate_dir,
            features,
            output_dir,
            run,
        } => {
            if let Some(features) = features {
                config.runner = config.runner.with_features(features);
            }
            if let Some(dir) = output_dir {
                config.runner = config.runner.with_output_dir(dir);
            }
            if let Some(run) = run {
                config.runner = config.runner.with_run(run);
            }
            info!(crate_dir = %crate_dir.display(), run = config.runner.run, "starting coverage run");
            print_json(&commands::coverage(&config, &crate_dir)?)
        }
        Command::Decode { trace_file } => print_json(&commands::decode(&trace_file)?),
        Command::Types { callables, seed } => {
            let seed = seed.unwrap_or(config.seed);
            print_json(&commands::types(&callables, seed)?)
        }
    }
}
