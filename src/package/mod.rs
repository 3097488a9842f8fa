//! Package descriptors (rocketpack.yaml)
//!
//! A package is either a Blender build or an addon. It lists one source per
//! platform and may depend on addons:
//!
//! ```yaml
//! type: build
//! name: Blender
//! version: 4.2.2
//! sources:
//!   - platform: linux
//!     resource: blender-4.2.2-linux-x64/blender
//!     uri: https://download.blender.org/release/Blender4.2/blender-4.2.2-linux-x64.tar.xz
//! dependencies:
//!   - reference: github.com/rocketblend/official-library/packages/v0/addons/sverchok
//!     type: addon
//! ```

pub mod dependency;
pub mod source;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, package::validation_failed};
use crate::platform::Platform;

pub use dependency::Dependency;
pub use source::Source;

/// File name of a package descriptor inside the registry
pub const PACKAGE_FILE_NAME: &str = "rocketpack.yaml";

/// URI schemes a source may download from
const URI_SCHEMES: [&str; 3] = ["https://", "http://", "file://"];

/// Kind of package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Build,
    Addon,
}

impl PackageType {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageType::Build => "build",
            PackageType::Addon => "addon",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded package descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,

    #[serde(rename = "type")]
    pub package_type: PackageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub sources: Vec<Source>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl Package {
    pub fn new(package_type: PackageType, sources: Vec<Source>) -> Self {
        Self {
            spec: None,
            package_type,
            name: None,
            version: None,
            sources,
            dependencies: Vec::new(),
        }
    }

    /// Parse and validate a descriptor; `reference` is only used for error context
    pub fn from_yaml(yaml: &str, reference: &str) -> Result<Self> {
        let package: Self =
            serde_yaml::from_str(yaml).map_err(|e| validation_failed(reference, e.to_string()))?;
        package.validate(reference)?;
        Ok(package)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Source for `platform`: exact match first, then the `any` fallback
    pub fn source(&self, platform: Platform) -> Option<&Source> {
        self.sources
            .iter()
            .find(|s| s.platform == platform)
            .or_else(|| self.sources.iter().find(|s| s.platform == Platform::Any))
    }

    /// Bundled packages ship with the build and never need downloading
    pub fn bundled(&self) -> bool {
        self.sources.iter().all(|s| s.uri.is_none())
    }

    pub fn is_build(&self) -> bool {
        self.package_type == PackageType::Build
    }

    /// Check the descriptor's schema invariants
    pub fn validate(&self, reference: &str) -> Result<()> {
        if self.is_build() && self.sources.is_empty() {
            return Err(validation_failed(reference, "builds must declare at least one source"));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.platform == Platform::Undefined {
                return Err(validation_failed(reference, "source platform is undefined"));
            }

            if source.resource.trim().is_empty() {
                return Err(validation_failed(
                    reference,
                    format!("source for '{}' has no resource", source.platform),
                ));
            }

            if !source.resource_is_contained() {
                return Err(validation_failed(
                    reference,
                    format!(
                        "resource '{}' must be a relative path inside the installation directory",
                        source.resource
                    ),
                ));
            }

            if !seen.insert(source.platform) {
                return Err(validation_failed(
                    reference,
                    format!("duplicate source for platform '{}'", source.platform),
                ));
            }

            if let Some(uri) = &source.uri {
                if !URI_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
                    return Err(validation_failed(
                        reference,
                        format!("unsupported source uri '{uri}'"),
                    ));
                }
                if source.download_file_name().is_none() {
                    return Err(validation_failed(
                        reference,
                        format!("source uri '{uri}' has no file name"),
                    ));
                }
            }
        }

        if let Some(dep) = self
            .dependencies
            .iter()
            .find(|d| d.package_type == PackageType::Build)
        {
            return Err(validation_failed(
                reference,
                format!("dependency '{}' is a build; only addons may be dependencies", dep.reference),
            ));
        }

        Ok(())
    }
}
