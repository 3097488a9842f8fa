//! Shorthand aliases for references
//!
//! An alias table maps a short prefix (`builds`) to a canonical reference
//! prefix (`github.com/rocketblend/official-library/packages/v0/builds`).
//! Expansion happens before parsing, so `builds/blender/4.2.2` becomes a
//! full reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Reference;
use crate::error::Result;

/// Mapping from alias prefix to canonical reference prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<String, String>);

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` as shorthand for `canonical`
    pub fn insert(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.0.insert(alias.into(), canonical.into());
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.0.get(alias).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expand the longest matching alias in `input`, then parse the result
    pub fn resolve(&self, input: &str) -> Result<Reference> {
        aliased(input, self)
    }

    fn longest_match(&self, input: &str) -> Option<(&str, &str)> {
        self.iter()
            .filter(|(alias, _)| matches_prefix(input, alias))
            .max_by_key(|(alias, _)| alias.len())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Alias prefixes match whole segments only
fn matches_prefix(input: &str, alias: &str) -> bool {
    let alias = alias.trim_end_matches('/');
    if alias.is_empty() {
        return false;
    }

    match input.strip_prefix(alias) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Resolve a reference string through an alias table
///
/// Input that matches no alias is parsed as-is, so a full reference
/// passes through unchanged and anything else is an error.
pub fn aliased(input: &str, aliases: &AliasTable) -> Result<Reference> {
    let Some((alias, canonical)) = aliases.longest_match(input) else {
        return Reference::parse(input);
    };

    let remainder = &input[alias.trim_end_matches('/').len()..];
    let expanded = format!("{}{}", canonical.trim_end_matches('/'), remainder);
    Reference::parse(&expanded)
}
