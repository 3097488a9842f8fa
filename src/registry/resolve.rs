//! Manifest-level dependency resolution

use tokio_util::sync::CancellationToken;

use super::{GetPackagesOptions, PackageRegistry};
use crate::error::Result;
use crate::package::Dependency;
use crate::reference::Reference;

/// A dependency list split into what was asked for and what came along
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencies {
    /// Requested references, in request order, typed by their package
    pub direct: Vec<Dependency>,
    /// Transitive references, sorted, flagged `indirect`
    pub indirect: Vec<Dependency>,
}

impl ResolvedDependencies {
    /// Direct entries followed by indirect ones
    pub fn into_dependencies(self) -> Vec<Dependency> {
        let mut all = self.direct;
        all.extend(self.indirect);
        all
    }
}

impl PackageRegistry {
    /// Expand `dependencies` to their closure and type every entry with the
    /// package it resolved to
    pub fn resolve_dependencies(
        &self,
        token: &CancellationToken,
        dependencies: &[Dependency],
        update: bool,
    ) -> Result<ResolvedDependencies> {
        let mut requested: Vec<Reference> = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            if !requested.contains(&dependency.reference) {
                requested.push(dependency.reference.clone());
            }
        }

        let packages =
            self.get_packages(token, &GetPackagesOptions::closure(requested.clone(), update))?;

        let direct = requested
            .iter()
            .filter_map(|reference| {
                packages
                    .get(reference)
                    .map(|package| Dependency::new(reference.clone(), package.package_type))
            })
            .collect();

        let indirect = packages
            .iter()
            .filter(|(reference, _)| !requested.contains(reference))
            .map(|(reference, package)| {
                Dependency::new(reference.clone(), package.package_type).into_indirect()
            })
            .collect();

        Ok(ResolvedDependencies { direct, indirect })
    }
}
