use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde_json::json;
use sweep_unit::{collect_results, registry_write, Registry};

use super::print_json;
use crate::Context;

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Directory searched recursively for `wu_*.pcl` snapshots.
    #[arg(long)]
    pub root: PathBuf,
    /// Export path; `.sqlite` or `.db` writes SQLite, anything else CSV.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(ctx: &Context, args: &CollectArgs) -> Result<(), Box<dyn Error>> {
    let table = collect_results(Arc::clone(&ctx.space), &args.root)?;
    let export = table.to_tabular_export(ctx.space.factor_names());
    let registry = Registry::from_path(&args.out);
    registry_write(&registry, &export)?;
    print_json(&json!({
        "out": registry.path().display().to_string(),
        "rows": export.rows.len(),
        "columns": export.columns.len(),
    }))
}
