use crate::error::{Error, Result};
use crate::runner::Outcome;

/// Print the run outcome as formatted JSON to stdout.
pub fn print_outcome_json(outcome: &Outcome) -> Result<()> {
    let output = serde_json::to_string_pretty(outcome)
        .map_err(|e| Error::Parse(format!("JSON serialize: {}", e)))?;
    println!("{}", output);
    Ok(())
}
