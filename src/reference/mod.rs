//! Package references
//!
//! A reference addresses a package inside a registry:
//!
//! ```text
//! github.com/rocketblend/official-library/packages/v0/builds/blender/4.2.2
//! └──────────── repo ──────────────────┘└──────────── repo path ─────────┘
//! ```
//!
//! The first three segments name the registry repository (the clone unit),
//! the remainder is the package directory inside that clone. References
//! starting with `local/` are never cloned or pulled.

mod alias;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, reference::invalid};

pub use alias::{AliasTable, aliased};

/// First segment of references that only exist on this machine
pub const LOCAL_PREFIX: &str = "local";

/// Synthetic repository value shared by all local references
pub const LOCAL_REPO: &str = "local/";

/// Number of leading segments naming the registry repository
const REPO_SEGMENTS: usize = 3;

/// A validated, hierarchical package reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Parse and validate a reference string
    pub fn parse(input: &str) -> Result<Self> {
        validate(input)?;
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this reference lives only in the local package store
    pub fn is_local_only(&self) -> bool {
        is_local(&self.0)
    }

    /// Registry repository this reference belongs to (`host/org/repo`)
    pub fn repo(&self) -> &str {
        if self.is_local_only() {
            return LOCAL_REPO;
        }

        // Validated on construction, so there are always more than three segments
        let end = self
            .0
            .match_indices('/')
            .nth(REPO_SEGMENTS - 1)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }

    /// Remote URL of the registry repository
    pub fn repo_url(&self) -> Result<String> {
        if self.is_local_only() {
            return Err(invalid(&self.0, "local references have no registry URL"));
        }

        Ok(format!("https://{}", self.repo()))
    }

    /// Path of the package inside its registry repository
    pub fn repo_path(&self) -> &str {
        if self.is_local_only() {
            return self.0[LOCAL_REPO.len()..].trim_start_matches('/');
        }

        &self.0[self.repo().len() + 1..]
    }
}

fn is_local(input: &str) -> bool {
    input == LOCAL_PREFIX || input.starts_with(LOCAL_REPO)
}

fn validate(input: &str) -> Result<()> {
    if input.trim().is_empty() {
        return Err(invalid(input, "reference is empty"));
    }

    let segments: Vec<&str> = input.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid(input, "reference contains empty segments"));
    }

    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(invalid(input, "reference contains relative path segments"));
    }

    if segments.iter().any(|s| s.contains('\\')) {
        return Err(invalid(input, "reference contains backslashes"));
    }

    if is_local(input) {
        if segments.len() < 2 {
            return Err(invalid(input, "local reference has no package path"));
        }
        return Ok(());
    }

    if segments.len() <= REPO_SEGMENTS {
        return Err(invalid(
            input,
            format!(
                "expected at least {} segments (<host>/<org>/<repo>/<path>)",
                REPO_SEGMENTS + 1
            ),
        ));
    }

    Ok(())
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Reference {
    type Err = crate::error::RocketError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Reference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Reference::parse(&raw).map_err(serde::de::Error::custom)
    }
}
