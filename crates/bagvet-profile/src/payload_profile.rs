//! # Payload Profile
//!
//! Directory-structure rules for a bag's payload: which directories must
//! exist, where files are allowed to live, and how severe each kind of
//! mismatch is.

use std::path::Path;

use serde::{Deserialize, Serialize};

use bagvet_core::{BagvetError, Severity};

use crate::schema::ProfileKind;
use crate::source::{self, ProfileFetcher, ProfileFormat};

/// One path rule: a literal payload-relative directory prefix, or a
/// regex that payload-relative paths are matched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathRule {
    /// Literal directory prefix, e.g. `images/`.
    Literal(String),
    /// Anchored regex over payload-relative paths.
    Regex {
        /// The pattern source; compiled by the structure validator.
        regex: String,
    },
}

impl PathRule {
    /// The rule source as written in the profile, for finding subjects.
    pub fn source(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex { regex } => regex,
        }
    }

    /// Whether this rule requires regex compilation.
    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }
}

/// Per-rule severity overrides, with the documented defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeverityOverrides {
    /// Severity of a required directory that does not exist.
    #[serde(rename = "required-missing", default = "severity_error")]
    pub required_missing: Severity,
    /// Severity of a payload file outside every allowed location.
    #[serde(rename = "unexpected-location", default = "severity_warning")]
    pub unexpected_location: Severity,
    /// Severity of two payload paths differing only in capitalization.
    #[serde(rename = "case-collision", default = "severity_error")]
    pub case_collision: Severity,
}

impl Default for SeverityOverrides {
    fn default() -> Self {
        Self {
            required_missing: Severity::Error,
            unexpected_location: Severity::Warning,
            case_collision: Severity::Error,
        }
    }
}

fn severity_error() -> Severity {
    Severity::Error
}

fn severity_warning() -> Severity {
    Severity::Warning
}

/// Declarative directory-structure rules for a payload.
///
/// An absent allowed list permits any location; an absent required list
/// requires nothing. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadProfile {
    /// Directories that must exist under the payload root.
    #[serde(rename = "Payload-Folders-Required", default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<PathRule>,

    /// Locations payload files may occupy. `None` allows everything.
    #[serde(rename = "Payload-Folders-Allowed", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<PathRule>>,

    /// Severity of each rule kind.
    #[serde(rename = "Severities", default, skip_serializing_if = "is_default_severities")]
    pub severities: SeverityOverrides,
}

fn is_default_severities(overrides: &SeverityOverrides) -> bool {
    *overrides == SeverityOverrides::default()
}

impl PayloadProfile {
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
        source::parse_document(text, format, ProfileKind::Payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_rules() {
        let profile = PayloadProfile::from_str(
            r#"{
                "Payload-Folders-Required": ["images/"],
                "Payload-Folders-Allowed": ["images/", { "regex": "docs/[0-9]+/.*" }]
            }"#,
            ProfileFormat::Json,
        )
        .unwrap();

        assert_eq!(profile.required, vec![PathRule::Literal("images/".into())]);
        let allowed = profile.allowed.unwrap();
        assert!(allowed[1].is_regex());
        assert_eq!(allowed[1].source(), "docs/[0-9]+/.*");
    }

    #[test]
    fn test_default_severities() {
        let profile = PayloadProfile::from_str("{}", ProfileFormat::Json).unwrap();
        assert_eq!(profile.severities.required_missing, Severity::Error);
        assert_eq!(profile.severities.unexpected_location, Severity::Warning);
        assert_eq!(profile.severities.case_collision, Severity::Error);
    }

    #[test]
    fn test_severity_overrides_parse() {
        let profile = PayloadProfile::from_str(
            r#"{ "Severities": { "unexpected-location": "error" } }"#,
            ProfileFormat::Json,
        )
        .unwrap();
        assert_eq!(profile.severities.unexpected_location, Severity::Error);
        assert_eq!(profile.severities.required_missing, Severity::Error);
    }

    #[test]
    fn test_absent_allowed_list_means_none() {
        let profile = PayloadProfile::from_str("{}", ProfileFormat::Json).unwrap();
        assert!(profile.allowed.is_none());
    }
}
