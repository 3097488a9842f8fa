//! Profile tidying
//!
//! A tidy profile lists each requested reference once, typed by what it
//! resolved to, followed by every transitively required package flagged
//! `indirect`. Only one build survives: the first one listed, which is the
//! most recently added since new dependencies are prepended.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Driver;
use crate::error::Result;
use crate::package::{Dependency, PackageType};
use crate::profile::Profile;

impl Driver {
    pub(super) fn tidy_dependencies(
        &self,
        token: &CancellationToken,
        profile: &Profile,
        update: bool,
    ) -> Result<Vec<Dependency>> {
        let requested: Vec<Dependency> = profile.direct().cloned().collect();
        let resolved = self.registry.resolve_dependencies(token, &requested, update)?;

        let mut seen_build = false;
        let mut dropped = false;
        let direct: Vec<Dependency> = resolved
            .direct
            .iter()
            .filter(|dependency| {
                if dependency.package_type != PackageType::Build {
                    return true;
                }
                if seen_build {
                    info!(reference = %dependency.reference, "dropping superseded build");
                    dropped = true;
                    return false;
                }
                seen_build = true;
                true
            })
            .cloned()
            .collect();

        // Dropped builds may have been the only path to some indirect
        // packages, so recompute the closure from what is left.
        let resolved = if dropped {
            self.registry.resolve_dependencies(token, &direct, false)?
        } else {
            resolved
        };

        let mut direct = resolved.direct;
        let mut indirect = resolved.indirect;
        direct.sort_by(|a, b| a.reference.cmp(&b.reference));
        indirect.sort_by(|a, b| a.reference.cmp(&b.reference));
        debug!(
            direct = direct.len(),
            indirect = indirect.len(),
            "tidied dependencies"
        );

        direct.extend(indirect);
        Ok(direct)
    }
}
