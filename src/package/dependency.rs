//! Dependency declarations shared by profiles and package descriptors

use serde::{Deserialize, Serialize};

use super::PackageType;
use crate::reference::Reference;

/// A reference paired with the package type it is expected to resolve to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub reference: Reference,

    #[serde(rename = "type")]
    pub package_type: PackageType,

    /// Pulled in transitively rather than requested explicitly
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub indirect: bool,
}

impl Dependency {
    pub fn new(reference: Reference, package_type: PackageType) -> Self {
        Self {
            reference,
            package_type,
            indirect: false,
        }
    }

    pub fn build(reference: Reference) -> Self {
        Self::new(reference, PackageType::Build)
    }

    pub fn addon(reference: Reference) -> Self {
        Self::new(reference, PackageType::Addon)
    }

    /// Mark this dependency as transitively required
    #[must_use]
    pub fn into_indirect(mut self) -> Self {
        self.indirect = true;
        self
    }

    pub fn is_direct(&self) -> bool {
        !self.indirect
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_dependency_omits_indirect_flag() {
        let dep = Dependency::addon(Reference::parse("host/org/repo/addons/a").unwrap());
        let json = serde_json::to_string(&dep).unwrap();
        assert_eq!(json, r#"{"reference":"host/org/repo/addons/a","type":"addon"}"#);
    }

    #[test]
    fn test_indirect_dependency_roundtrip() {
        let dep = Dependency::addon(Reference::parse("host/org/repo/addons/a").unwrap())
            .into_indirect();
        let json = serde_json::to_string(&dep).unwrap();
        assert!(json.contains(r#""indirect":true"#));
        let parsed: Dependency = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, dep);
        assert!(!parsed.is_direct());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let parsed: std::result::Result<Dependency, _> =
            serde_json::from_str(r#"{"reference":"host/org/repo/a","type":"theme"}"#);
        assert!(parsed.is_err());
    }
}
