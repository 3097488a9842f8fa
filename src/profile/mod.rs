//! Project profiles
//!
//! A profile is the manifest of one project. It lives next to the project's
//! files:
//!
//! ```text
//! <project>/
//! └── .rocketblend/
//!     └── profile.json
//! ```
//!
//! Dependencies are ordered. The single direct build decides which Blender
//! the project runs with; addons follow. Entries marked `indirect` were pulled
//! in by other packages and are recorded for reproducibility.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, fs as fs_err, profile as profile_err};
use crate::package::{Dependency, PackageType};
use crate::reference::Reference;

/// Directory holding the profile inside a project
pub const PROFILE_DIR: &str = ".rocketblend";

/// Profile file name
pub const PROFILE_FILE: &str = "profile.json";

/// Schema version written into new profiles
pub const PROFILE_SPEC: &str = "0.1.0";

/// Project manifest
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Refuse to run with installations that are not pinned in the profile
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strict: bool,
}

/// Path of the profile file for a project directory
pub fn profile_path(project: &Path) -> PathBuf {
    project.join(PROFILE_DIR).join(PROFILE_FILE)
}

impl Profile {
    /// Fresh profile for a new project running `build`
    pub fn new_project(build: Reference) -> Self {
        Self {
            spec: Some(PROFILE_SPEC.to_string()),
            dependencies: vec![Dependency::build(build)],
            strict: false,
        }
    }

    /// Prepend dependencies so newer entries win over older ones
    pub fn add_dependencies(&mut self, deps: impl IntoIterator<Item = Dependency>) {
        let mut combined: Vec<Dependency> = deps.into_iter().collect();
        combined.append(&mut self.dependencies);
        self.dependencies = combined;
    }

    /// Remove the first entry matching each reference
    pub fn remove_dependencies<'a>(&mut self, references: impl IntoIterator<Item = &'a Reference>) {
        for reference in references {
            if let Some(pos) = self
                .dependencies
                .iter()
                .position(|d| &d.reference == reference)
            {
                self.dependencies.remove(pos);
            }
        }
    }

    pub fn find_all(&self, package_type: PackageType) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(move |d| d.package_type == package_type)
    }

    pub fn direct(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(|d| d.is_direct())
    }

    pub fn indirect(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(|d| !d.is_direct())
    }

    /// The direct build, if any
    pub fn build(&self) -> Option<&Dependency> {
        self.direct()
            .find(|d| d.package_type == PackageType::Build)
    }

    pub fn validate(&self) -> Result<()> {
        let direct_builds = self
            .direct()
            .filter(|d| d.package_type == PackageType::Build)
            .count();
        if direct_builds > 1 {
            return Err(profile_err::validation_failed(format!(
                "only one direct build is allowed, found {direct_builds}"
            )));
        }

        if self.direct().next().is_none() && self.indirect().next().is_some() {
            return Err(profile_err::validation_failed(
                "indirect dependencies require at least one direct dependency",
            ));
        }

        Ok(())
    }

    /// Load and validate the profile of `project`
    pub fn load(project: &Path) -> Result<Self> {
        let path = profile_path(project);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(profile_err::not_found(&path));
            }
            Err(e) => return Err(fs_err::read_failed(&path, e)),
        };

        let profile: Self = serde_json::from_str(&content)
            .map_err(|e| profile_err::validation_failed(format!("{}: {e}", path.display())))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Validate and write the profile of `project`
    ///
    /// With `ensure_paths` the profile directory is created when missing;
    /// an existing file is only replaced when `overwrite` is set.
    pub fn save(&self, project: &Path, ensure_paths: bool, overwrite: bool) -> Result<()> {
        self.validate()?;

        let path = profile_path(project);
        if !overwrite && path.exists() {
            return Err(profile_err::exists(&path));
        }

        if let Some(parent) = path.parent() {
            if ensure_paths {
                fs::create_dir_all(parent).map_err(|e| fs_err::write_failed(parent, e))?;
            } else if !parent.is_dir() {
                return Err(profile_err::not_found(&path));
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content + "\n").map_err(|e| fs_err::write_failed(&path, e))?;
        Ok(())
    }
}
