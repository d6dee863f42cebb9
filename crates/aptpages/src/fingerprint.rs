//! Canonical identity of one publish request.

use serde::{Deserialize, Serialize};

use crate::deb::PackageMetadata;
use crate::error::PublishError;

/// Version of the fingerprint encoding. Bump only when the field set changes;
/// records carrying any other version never match.
pub const FORMAT_VERSION: u32 = 1;

/// What one publish action put on the hosting branch: a package version and
/// architecture, published into one distribution.
///
/// Field order is the canonical key order of the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fingerprint {
    pub format_version: u32,
    #[serde(rename = "sw_version")]
    pub package_version: String,
    #[serde(rename = "sw_architecture")]
    pub package_architecture: String,
    #[serde(rename = "linux_version")]
    pub target_distribution: String,
}

impl Fingerprint {
    /// Build a fingerprint at the current [`FORMAT_VERSION`].
    ///
    /// Every field is trimmed; an empty field is a configuration error.
    pub fn new(
        package_version: &str,
        package_architecture: &str,
        target_distribution: &str,
    ) -> Result<Self, PublishError> {
        let field = |name: &str, value: &str| {
            let value = value.trim();
            if value.is_empty() {
                Err(PublishError::Config(format!(
                    "cannot fingerprint package: {name} is empty"
                )))
            } else {
                Ok(value.to_string())
            }
        };

        Ok(Self {
            format_version: FORMAT_VERSION,
            package_version: field("package version", package_version)?,
            package_architecture: field("package architecture", package_architecture)?,
            target_distribution: field("target distribution", target_distribution)?,
        })
    }

    /// Fingerprint for a package read from its control metadata.
    pub fn for_package(
        meta: &PackageMetadata,
        target_distribution: &str,
    ) -> Result<Self, PublishError> {
        Self::new(&meta.version, &meta.architecture, target_distribution)
    }

    /// Canonical single-line JSON form.
    pub fn canonical(&self) -> String {
        // Only strings and an integer: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) -> {}",
            self.package_version, self.package_architecture, self.target_distribution
        )
    }
}
