//! Tidy command

use super::{Context, success};
use crate::cli::TidyArgs;
use crate::error::Result;

pub fn run(context: &Context, args: &TidyArgs) -> Result<()> {
    let mut entries = context.load()?;
    context
        .services
        .driver
        .tidy_profiles(&context.token, &mut entries, args.update)?;
    context.save(&entries)?;
    success("Profile tidied");
    Ok(())
}
