//! # Profile Sources
//!
//! Where profile documents come from and how they are parsed. Local
//! paths are handled by the bundled [`FileFetcher`]; remote retrieval is
//! an external collaborator behind the [`ProfileFetcher`] trait.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use bagvet_core::BagvetError;

use crate::schema::{self, ProfileKind};

/// Serialization format of a profile document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl ProfileFormat {
    /// Derive the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns `BagvetError::Configuration` for extensions that are not
    /// a profile format; guessing would mask caller mistakes.
    pub fn from_path(path: &Path) -> Result<Self, BagvetError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            other => Err(BagvetError::configuration(format!(
                "cannot infer profile format of '{}' (extension {:?}; expected .json, .yaml, or .yml)",
                path.display(),
                other.unwrap_or("none"),
            ))),
        }
    }
}

/// Retrieval seam for profile documents.
///
/// Implementations resolve a locator to raw document text. Network-backed
/// implementations live outside this crate and must map transport
/// failures to `BagvetError::Configuration` with the locator in the
/// reason, so a dead profile server is distinguishable from an invalid
/// bag.
pub trait ProfileFetcher {
    /// Fetch the raw document behind `locator`.
    fn fetch(&self, locator: &str) -> Result<String, BagvetError>;
}

/// Fetcher for local filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl ProfileFetcher for FileFetcher {
    fn fetch(&self, locator: &str) -> Result<String, BagvetError> {
        std::fs::read_to_string(locator).map_err(|e| BagvetError::io(locator, e))
    }
}

/// Parse document text, schema-check it, and deserialize it into the
/// typed profile.
pub(crate) fn parse_document<T: DeserializeOwned>(
    text: &str,
    format: ProfileFormat,
    kind: ProfileKind,
) -> Result<T, BagvetError> {
    let value: Value = match format {
        ProfileFormat::Json => serde_json::from_str(text)
            .map_err(|e| BagvetError::configuration(format!("profile is not valid JSON: {e}")))?,
        ProfileFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|e| BagvetError::configuration(format!("profile is not valid YAML: {e}")))?,
    };

    schema::check_profile_document(kind, &value)?;

    serde_json::from_value(value)
        .map_err(|e| BagvetError::configuration(format!("profile failed to deserialize: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ProfileFormat::from_path(Path::new("p.json")).unwrap(),
            ProfileFormat::Json
        );
        assert_eq!(
            ProfileFormat::from_path(Path::new("p.yml")).unwrap(),
            ProfileFormat::Yaml
        );
        assert!(ProfileFormat::from_path(Path::new("p.toml")).is_err());
    }

    #[test]
    fn test_file_fetcher_reads_and_reports_io() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{}").unwrap();
        let text = FileFetcher
            .fetch(file.path().to_str().unwrap())
            .unwrap();
        assert_eq!(text, "{}");

        let err = FileFetcher.fetch("/nonexistent/profile.json").unwrap_err();
        assert!(matches!(err, BagvetError::Io { .. }));
    }
}
