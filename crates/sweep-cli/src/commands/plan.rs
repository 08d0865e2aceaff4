use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use sweep_core::{parse_scalar, CanonicalDict, Value};
use sweep_grid::expand;
use sweep_unit::{plan_workunits, write_workunit_source};

use super::print_json;
use crate::Context;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Destination workunit source file.
    #[arg(long)]
    pub out: PathBuf,
    /// Factor split across workunits, e.g. `biomodel_num=1,2,3` or `biomodel_num=all`.
    #[arg(long = "vary", value_name = "KEY=LEVELS")]
    pub vary: Vec<String>,
    /// Factor shared by every workunit; commas give a list swept inside each unit.
    #[arg(long = "set", value_name = "KEY=LEVELS")]
    pub set: Vec<String>,
}

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let base = parse_assignments(&args.set)?;
    let vary = CanonicalDict::from_map(parse_assignments(&args.vary)?)?;
    for key in vary.keys() {
        ctx.space.condition_schema().check_key(key)?;
    }
    let partition = expand(&vary, ctx.space.expansions())?;
    let specs = plan_workunits(&ctx.space, &base, &partition)?;
    write_workunit_source(&args.out, &specs)?;
    print_json(&json!({
        "out": args.out.display().to_string(),
        "workunits": specs.len(),
        "partition": partition.multivalued_factors(),
    }))
}

fn parse_assignments(raw: &[String]) -> Result<BTreeMap<String, Value>, Box<dyn Error>> {
    let mut entries = BTreeMap::new();
    for item in raw {
        let (key, levels) = item
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=LEVELS, got `{item}`"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing factor name in `{item}`").into());
        }
        if entries.insert(key.to_string(), parse_levels(levels)).is_some() {
            return Err(format!("factor `{key}` given twice").into());
        }
    }
    Ok(entries)
}

fn parse_levels(text: &str) -> Value {
    let levels: Vec<_> = text.split(',').map(|level| parse_scalar(level.trim())).collect();
    match <[_; 1]>::try_from(levels) {
        Ok([single]) => Value::Single(single),
        Err(levels) => Value::List(levels),
    }
}
