//! Uninstall command
//!
//! Removes references from the profile. Installed files stay in the shared
//! cache since other projects may use them.

use tracing::warn;

use super::{Context, success};
use crate::cli::UninstallArgs;
use crate::error::Result;

pub fn run(context: &Context, args: &UninstallArgs) -> Result<()> {
    let references = context.references(&args.references)?;
    let mut entries = context.load()?;

    for entry in &mut entries {
        for reference in &references {
            if !entry.profile.direct().any(|d| &d.reference == reference) {
                warn!(reference = %reference, "not a direct dependency of the project");
            }
        }
        entry.profile.remove_dependencies(&references);
    }

    context
        .services
        .driver
        .tidy_profiles(&context.token, &mut entries, false)?;
    context.save(&entries)?;

    success(&format!("Removed {} references", references.len()));
    Ok(())
}
