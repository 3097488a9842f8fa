//! Target platforms for package sources
//!
//! Every package source is tagged with the platform it runs on. The tags
//! are part of the package descriptor format, so their string forms are
//! stable: `any`, `windows`, `linux`, `macos/intel`, `macos/apple`.

pub mod detection;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, RocketError};

pub use detection::current;

/// A platform tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Platform {
    /// Fallback source usable on every platform
    Any,
    Windows,
    Linux,
    MacosIntel,
    MacosApple,
    /// Host platform could not be determined
    #[default]
    Undefined,
}

impl Platform {
    /// All tags accepted in package sources
    pub const SOURCE_TAGS: [Platform; 5] = [
        Platform::Any,
        Platform::Windows,
        Platform::Linux,
        Platform::MacosIntel,
        Platform::MacosApple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Any => "any",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::MacosIntel => "macos/intel",
            Platform::MacosApple => "macos/apple",
            Platform::Undefined => "undefined",
        }
    }

    /// Whether packages can be installed for this platform
    pub fn is_supported(self) -> bool {
        !matches!(self, Platform::Undefined | Platform::Any)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = RocketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "any" | "" => Ok(Platform::Any),
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "macos/intel" => Ok(Platform::MacosIntel),
            "macos/apple" => Ok(Platform::MacosApple),
            "undefined" => Ok(Platform::Undefined),
            other => Err(RocketError::ConfigInvalid {
                message: format!("unknown platform '{other}'"),
            }),
        }
    }
}

impl Serialize for Platform {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
