use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sweep_unit::{load_config, FactorSpace, SweepConfig};
use tracing_subscriber::EnvFilter;

use commands::{
    batch::{self, BatchArgs},
    collect::{self, CollectArgs},
    plan::{self, PlanArgs},
    run::{self, RunArgs},
    show::{self, ShowArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sweep", about = "Resumable factorial sweep driver")]
struct Cli {
    /// YAML configuration describing factors, metrics and expansions.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe a workunit specification without running it.
    Show(ShowArgs),
    /// Run (or resume) one workunit with the synthetic evaluator.
    Run(RunArgs),
    /// Run every workunit listed in a source file.
    Batch(BatchArgs),
    /// Split a sweep into a workunit source file.
    Plan(PlanArgs),
    /// Merge all snapshots below a directory into one export.
    Collect(CollectArgs),
}

/// Settings shared by every subcommand.
pub struct Context {
    pub config: SweepConfig,
    pub space: Arc<FactorSpace>,
}

impl Context {
    fn load(path: Option<&PathBuf>) -> Result<Self, Box<dyn Error>> {
        let config = match path {
            Some(path) => load_config(path)?,
            None => SweepConfig::default(),
        };
        let space = Arc::new(config.factor_space()?);
        Ok(Self { config, space })
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let ctx = Context::load(cli.config.as_ref())?;
    match cli.command {
        Command::Show(args) => show::run(&ctx, &args),
        Command::Run(args) => run::run(&ctx, &args),
        Command::Batch(args) => batch::run(&ctx, &args),
        Command::Plan(args) => plan::run(&ctx, &args),
        Command::Collect(args) => collect::run(&ctx, &args),
    }
}
