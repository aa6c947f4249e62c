//! # Bag Profile
//!
//! Metadata conformance rules for a bag: which tags must exist, which
//! values they may take, which BagIt versions are accepted, and whether
//! serialization is acceptable. One profile is evaluated per run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bagvet_core::BagvetError;

use crate::schema::ProfileKind;
use crate::source::{self, ProfileFetcher, ProfileFormat};

/// Constraint on one metadata tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagSpec {
    /// Whether the tag must be present.
    #[serde(default)]
    pub required: bool,
    /// Closed value set; empty means any value is allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Regex every value must fully match, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Whether the tag may occur more than once. Defaults to true.
    #[serde(default = "default_repeatable")]
    pub repeatable: bool,
}

fn default_repeatable() -> bool {
    true
}

/// Whether a serialized (archived) bag satisfies the profile.
///
/// The validators operate on extracted directory bags, so `required`
/// can never be satisfied by a target they accept and is reported as a
/// finding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationPolicy {
    /// The bag must not be serialized.
    Forbidden,
    /// The bag must be serialized.
    Required,
    /// Either form is acceptable.
    #[default]
    Optional,
}

/// Declarative metadata-conformance rules for a bag.
///
/// Immutable once loaded. Field names follow the conventional
/// bagit-profile document keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagProfile {
    /// Free-form provenance of the profile itself.
    #[serde(rename = "BagIt-Profile-Info", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub info: BTreeMap<String, String>,

    /// Per-tag constraints for `bag-info.txt`.
    #[serde(rename = "Bag-Info", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bag_info: BTreeMap<String, TagSpec>,

    /// Accepted `BagIt-Version` values; empty accepts any version.
    #[serde(rename = "Accept-BagIt-Version", default, skip_serializing_if = "Vec::is_empty")]
    pub accept_bagit_version: Vec<String>,

    /// Serialization acceptance.
    #[serde(rename = "Serialization", default)]
    pub serialization: SerializationPolicy,

    /// Locator of a nested payload profile, for the structure validator.
    #[serde(rename = "Payload-Profile", default, skip_serializing_if = "Option::is_none")]
    pub payload_profile: Option<String>,
}

impl BagProfile {
    /// Load and schema-check a profile from a local path. The format is
    /// taken from the file extension.
    ///
    /// # Errors
    ///
    /// Returns `BagvetError::Io` if the path cannot be read and
    /// `BagvetError::Configuration` if the document fails parsing or
    /// schema validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BagvetError> {
        let path = path.as_ref();
        let format = ProfileFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| BagvetError::io(path, e))?;
        Self::from_str(&text, format)
    }

    /// Load and schema-check a profile through a fetcher seam.
    pub fn fetch(
        fetcher: &dyn ProfileFetcher,
        locator: &str,
        format: ProfileFormat,
    ) -> Result<Self, BagvetError> {
        let text = fetcher.fetch(locator)?;
        Self::from_str(&text, format)
    }

    /// Parse and schema-check a profile document.
    pub fn from_str(text: &str, format: ProfileFormat) -> Result<Self, BagvetError> {
        source::parse_document(text, format, ProfileKind::Bag)
    }
}
