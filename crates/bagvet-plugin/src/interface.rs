//! # Plugin Capability Contract
//!
//! The interface any format-identification/validation backend must
//! expose. The file-format validator treats every backend uniformly
//! through `dyn FormatPlugin` and never special-cases a concrete one.

use std::path::{Path, PathBuf};

use serde::Serialize;

use bagvet_core::{BagvetError, ValidationResult};

/// How an identification verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentificationEvidence {
    /// Magic-number match against the file contents.
    Signature,
    /// Derived from the file-name suffix only.
    Extension,
    /// No identification was possible.
    Unknown,
}

/// Per-file outcome of format identification.
///
/// Never mutated after creation. An unidentifiable file is a valid
/// outcome (`media_type: None`), not a failure; only an unreadable file
/// fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatIdentification {
    /// The file the verdict concerns.
    pub path: PathBuf,
    /// Identified media type, or `None` when the format is unknown.
    pub media_type: Option<String>,
    /// Strength of the identification.
    pub evidence: IdentificationEvidence,
}

impl FormatIdentification {
    /// The "format unknown" marker for a file.
    pub fn unknown(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            media_type: None,
            evidence: IdentificationEvidence::Unknown,
        }
    }

    /// An identification with the given media type and evidence.
    pub fn identified(
        path: impl Into<PathBuf>,
        media_type: impl Into<String>,
        evidence: IdentificationEvidence,
    ) -> Self {
        Self {
            path: path.into(),
            media_type: Some(media_type.into()),
            evidence,
        }
    }

    /// Whether no format could be identified.
    pub fn is_unknown(&self) -> bool {
        self.media_type.is_none()
    }
}

/// Static self-description of a plugin.
///
/// Read at configuration time, never per file. Used for documentation
/// output and for routing (a format outside `default_formats` is one
/// the plugin declares unsupported).
#[derive(Debug, Clone, Serialize)]
pub struct PluginDescriptor {
    /// Short stable identifier, e.g. `extension` or `jhove`.
    pub name: String,
    /// One-line description.
    pub summary: String,
    /// Longer description, including backend specifics.
    pub description: String,
    /// Media types the plugin claims to validate by default.
    pub default_formats: Vec<String>,
}

impl PluginDescriptor {
    /// Whether the plugin claims to validate the given media type.
    pub fn supports(&self, media_type: &str) -> bool {
        self.default_formats.iter().any(|f| f == media_type)
    }
}

/// Capability contract for format backends.
///
/// Plugins are stateless aside from their descriptor and safe to share
/// across concurrent file checks.
pub trait FormatPlugin: Send + Sync {
    /// The plugin's static self-description.
    fn descriptor(&self) -> &PluginDescriptor;

    /// Deterministic, side-effect-free identification of one file.
    ///
    /// Must not touch the network. Returns the unknown marker for
    /// empty or unrecognized files.
    ///
    /// # Errors
    ///
    /// `BagvetError::Io` when the file cannot be read.
    fn identify(&self, path: &Path) -> Result<FormatIdentification, BagvetError>;

    /// Check structural conformance of the file to the given format.
    ///
    /// For formats the plugin does not support, the result carries an
    /// INFO `format_unsupported` finding rather than silent success.
    ///
    /// # Errors
    ///
    /// `BagvetError::Io` when the file cannot be read,
    /// `BagvetError::Plugin` when the backend crashes, times out, or
    /// returns unusable output. Neither is a verdict on the file.
    fn validate(&self, path: &Path, media_type: &str) -> Result<ValidationResult, BagvetError>;
}
