//! Per-platform download sources

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

fn default_platform() -> Platform {
    Platform::Any
}

fn is_any(platform: &Platform) -> bool {
    *platform == Platform::Any
}

/// Where a package's resource comes from on one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Path of the resource inside the installation directory once extracted
    pub resource: String,

    /// Download location; absent for resources that ship with the build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default = "default_platform", skip_serializing_if = "is_any")]
    pub platform: Platform,
}

impl Source {
    pub fn new(resource: impl Into<String>, uri: Option<String>, platform: Platform) -> Self {
        Self {
            resource: resource.into(),
            uri,
            platform,
        }
    }

    /// File name of the downloaded artifact (last segment of the URI path)
    pub fn download_file_name(&self) -> Option<&str> {
        let uri = self.uri.as_deref()?;
        let without_query = uri.split(['?', '#']).next().unwrap_or(uri);
        without_query
            .rsplit('/')
            .next()
            .filter(|name| !matches!(*name, "" | "." | ".."))
    }

    /// Whether `resource` stays inside the installation directory: a
    /// relative path made only of normal components
    pub fn resource_is_contained(&self) -> bool {
        Path::new(&self.resource)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }
}
