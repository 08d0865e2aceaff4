use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde_json::json;
use sweep_unit::{SyntheticEvaluator, Workunit};

use super::print_json;
use crate::Context;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Canonical workunit specification.
    #[arg(long)]
    pub workunit: String,
    /// Snapshot directory; defaults to the configured output directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Biomodel numbers the synthetic evaluator fails on.
    #[arg(long = "fail", value_name = "BIOMODEL")]
    pub failing: Vec<i64>,
    /// Seed mixed into the synthetic metrics.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

pub fn run(ctx: &Context, args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| ctx.config.output.dir.clone());
    let evaluator = SyntheticEvaluator::new(&ctx.space)
        .with_failing(args.failing.iter().copied())
        .with_seed(args.seed);
    let mut unit = Workunit::resume_or_new(Arc::clone(&ctx.space), &args.workunit, &out)?;
    let summary = unit.run(&evaluator)?;
    let csv = out.join(format!("{}.csv", unit.encoding()));
    if ctx.config.output.write_csv {
        unit.export_csv(&csv)?;
    }
    print_json(&json!({
        "encoding": unit.encoding(),
        "snapshot": unit.snapshot_path().map(|path| path.display().to_string()),
        "csv": ctx.config.output.write_csv.then(|| csv.display().to_string()),
        "summary": summary,
        "state": unit.state(),
    }))
}
