//! Resolve command
//!
//! Prints the installations of the project as a JSON object keyed by
//! reference. Nothing is downloaded; missing installations are an error.

use super::Context;
use crate::error::Result;

pub fn run(context: &Context) -> Result<()> {
    let entries = context.load()?;
    let resolved = context
        .services
        .driver
        .resolve_profiles(&context.token, &entries)?;

    for installations in &resolved {
        println!("{}", serde_json::to_string_pretty(installations)?);
    }
    Ok(())
}
