//! Install command
//!
//! Adds the given references (typed by the registry) to the profile, then
//! tidies, installs and saves it.

use tracing::debug;

use super::{Context, success};
use crate::cli::InstallArgs;
use crate::error::Result;
use crate::package::Dependency;
use crate::registry::GetPackagesOptions;

pub fn run(context: &Context, args: &InstallArgs) -> Result<()> {
    let driver = &context.services.driver;
    let mut entries = context.load()?;

    let references = context.references(&args.references)?;
    if !references.is_empty() {
        let packages = context.services.registry.get_packages(
            &context.token,
            &GetPackagesOptions::shallow(references.clone(), false),
        )?;
        let added: Vec<Dependency> = references
            .iter()
            .filter_map(|reference| {
                packages
                    .get(reference)
                    .map(|package| Dependency::new(reference.clone(), package.package_type))
            })
            .collect();
        debug!(count = added.len(), "adding dependencies");
        for entry in &mut entries {
            entry.profile.add_dependencies(added.iter().cloned());
        }
    }

    driver.tidy_profiles(&context.token, &mut entries, false)?;
    driver.install_profiles(&context.token, &entries)?;
    context.save(&entries)?;

    let count: usize = entries.iter().map(|e| e.profile.dependencies.len()).sum();
    success(&format!("Installed {count} dependencies"));
    Ok(())
}
