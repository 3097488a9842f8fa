//! New command

use super::{Context, success};
use crate::cli::NewArgs;
use crate::driver::{ProfileEntry, SaveOptions};
use crate::error::Result;
use crate::profile::{Profile, profile_path};

pub fn run(context: &Context, args: &NewArgs) -> Result<()> {
    let build = context.services.config.default_build()?;
    let entries = [ProfileEntry::new(&context.project, Profile::new_project(build))];

    context.services.driver.save_profiles(
        &context.token,
        &entries,
        SaveOptions {
            ensure_paths: true,
            overwrite: args.force,
        },
    )?;

    success(&format!(
        "Created {}",
        profile_path(&context.project).display()
    ));
    Ok(())
}
