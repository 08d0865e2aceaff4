pub mod batch;
pub mod collect;
pub mod plan;
pub mod run;
pub mod show;

use std::error::Error;

use serde_json::Value;

/// Prints a JSON summary on stdout.
pub fn print_json(value: &Value) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
