use anyhow::Context as _;
use clap::{Parser, Subcommand};
use flexi_logger::{Logger, LoggerHandle};

use self::{
    cohorts::CohortsArg, importance::ImportanceArg, summary::SummaryArg, unwrap::UnwrapArg,
};

mod cohorts;
mod importance;
mod summary;
mod unwrap;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(flatten)]
    global: GlobalArgs,
    /// What to compute from the dashboard input
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GlobalArgs {
    /// Seed for the scatter-plot dither columns (random when omitted)
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    /// Log specification, e.g. "info" or "raidash_data=debug"; `RUST_LOG` takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Print counts, capabilities and column metadata
    Summary(#[clap(flatten)] SummaryArg),
    /// Evaluate cohort definitions and print their error statistics
    Cohorts(#[clap(flatten)] CohortsArg),
    /// Project one column, optionally binned or restricted to a cohort
    Unwrap(#[clap(flatten)] UnwrapArg),
    /// Print mean absolute local importance per feature
    Importance(#[clap(flatten)] ImportanceArg),
}

fn init_logger(level: &str) -> anyhow::Result<LoggerHandle> {
    Logger::try_with_env_or_str(level)
        .with_context(|| format!("Invalid log level: {level}"))?
        .start()
        .context("Failed to start logger")
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let _logger = init_logger(&args.global.log_level)?;
    match &args.mode {
        Mode::Summary(arg) => summary::run(arg, &args.global)?,
        Mode::Cohorts(arg) => cohorts::run(arg, &args.global)?,
        Mode::Unwrap(arg) => unwrap::run(arg, &args.global)?,
        Mode::Importance(arg) => importance::run(arg, &args.global)?,
    }
    Ok(())
}
