use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde_json::json;
use sweep_unit::{dispatch, load_workunit_source, DispatchOpts, SyntheticEvaluator};
use tracing::info;

use super::print_json;
use crate::Context;

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Workunit source file, one specification per line.
    #[arg(long)]
    pub source: PathBuf,
    /// Snapshot directory; defaults to the configured output directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Workunits processed in parallel; defaults to the configured value.
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Ignore existing snapshots and start every workunit over.
    #[arg(long, default_value_t = false)]
    pub fresh: bool,
    /// Biomodel numbers the synthetic evaluator fails on.
    #[arg(long = "fail", value_name = "BIOMODEL")]
    pub failing: Vec<i64>,
}

pub fn run(ctx: &Context, args: &BatchArgs) -> Result<(), Box<dyn Error>> {
    let specs = load_workunit_source(&args.source)?;
    info!(source = %args.source.display(), workunits = specs.len(), "loaded workunit source");
    let opts = DispatchOpts {
        out_dir: args.out.clone().unwrap_or_else(|| ctx.config.output.dir.clone()),
        resume: !args.fresh,
        concurrency: args.concurrency.unwrap_or(ctx.config.concurrency),
        write_csv: ctx.config.output.write_csv,
    };
    let evaluator = SyntheticEvaluator::new(&ctx.space).with_failing(args.failing.iter().copied());
    let report = dispatch(Arc::clone(&ctx.space), &specs, &evaluator, &opts)?;
    let failed: Vec<&str> = report
        .failed_units()
        .map(|unit| unit.encoding.as_str())
        .collect();
    print_json(&json!({
        "specs_hash": report.specs_hash,
        "workunits": report.workunits.len(),
        "processed": report.workunits.iter().map(|unit| unit.processed).sum::<usize>(),
        "failed_workunits": failed,
    }))?;
    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} workunit(s) failed; see dispatch_report.json", failed.len()).into())
    }
}
