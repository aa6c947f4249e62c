//! # Profile Document Validation
//!
//! Runtime validation of profile documents against the bundled JSON
//! Schemas (Draft 2020-12) before they are deserialized into typed
//! profiles.
//!
//! ## Trust Boundary
//!
//! Profiles arrive from outside the process. A document that does not
//! conform to its schema is rejected with structured violation context
//! (instance path, schema path, message); validating a bag against a
//! half-parsed profile would produce misleading verdicts.

use std::fmt;

use serde_json::Value;

use bagvet_core::BagvetError;

/// Bundled schema for bag profiles.
const BAG_PROFILE_SCHEMA: &str = include_str!("../schemas/bag-profile.schema.json");

/// Bundled schema for payload profiles.
const PAYLOAD_PROFILE_SCHEMA: &str = include_str!("../schemas/payload-profile.schema.json");

/// The profile document kinds this crate validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Metadata conformance rules (`bag-profile.schema.json`).
    Bag,
    /// Payload directory-structure rules (`payload-profile.schema.json`).
    Payload,
}

impl ProfileKind {
    fn schema_text(&self) -> &'static str {
        match self {
            Self::Bag => BAG_PROFILE_SCHEMA,
            Self::Payload => PAYLOAD_PROFILE_SCHEMA,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Bag => "bag-profile.schema.json",
            Self::Payload => "payload-profile.schema.json",
        }
    }
}

/// A single schema violation with structured context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the document.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Validate a parsed profile document against the bundled schema for its
/// kind.
///
/// # Errors
///
/// Returns `BagvetError::Configuration` listing every violation when the
/// document does not conform, or when the bundled schema itself fails to
/// compile (a build defect, surfaced loudly rather than masked).
pub fn check_profile_document(kind: ProfileKind, document: &Value) -> Result<(), BagvetError> {
    let schema: Value = serde_json::from_str(kind.schema_text()).map_err(|e| {
        BagvetError::configuration(format!("bundled schema '{}' is invalid JSON: {e}", kind.name()))
    })?;

    let mut options = jsonschema::options();
    options.with_draft(jsonschema::Draft::Draft202012);
    let validator = options.build(&schema).map_err(|e| {
        BagvetError::configuration(format!(
            "bundled schema '{}' failed to compile: {e}",
            kind.name()
        ))
    })?;

    let violations: Vec<Violation> = validator
        .iter_errors(document)
        .map(|error| Violation {
            instance_path: error.instance_path.to_string(),
            schema_path: error.schema_path.to_string(),
            message: error.to_string(),
        })
        .collect();

    if violations.is_empty() {
        return Ok(());
    }

    let rendered = violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(BagvetError::configuration(format!(
        "profile does not conform to '{}': {rendered}",
        kind.name()
    )))
}
