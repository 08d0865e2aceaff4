use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde_json::json;
use sweep_unit::Workunit;

use super::print_json;
use crate::Context;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Canonical workunit specification, e.g. `biomodel_num--1__method--leastsq`.
    #[arg(long)]
    pub workunit: String,
    /// Snapshot directory; when given, pending counts reflect saved progress.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(ctx: &Context, args: &ShowArgs) -> Result<(), Box<dyn Error>> {
    let unit = match &args.out {
        Some(dir) => Workunit::resume_or_new(Arc::clone(&ctx.space), &args.workunit, dir)?,
        None => Workunit::from_encoding(Arc::clone(&ctx.space), &args.workunit)?,
    };
    print_json(&json!({
        "encoding": unit.encoding(),
        "display": unit.to_string(),
        "snapshot": unit.snapshot_filename(),
        "conditions": unit.len(),
        "pending": unit.pending_count(),
        "multivalued_factors": unit.calc_multivalued_factors(),
        "state": unit.state(),
    }))
}
