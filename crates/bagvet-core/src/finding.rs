//! # Findings
//!
//! One discrete issue or confirmation reported by a validator. Findings
//! are the only channel through which expected nonconformance travels;
//! a bag failing a rule is a finding, never a propagated error.
//!
//! ## Severity Contract
//!
//! Only ERROR findings affect a result's validity. WARNING and INFO
//! findings are advisory and survive merging unchanged.

use serde::{Deserialize, Serialize};

/// Severity of a finding.
///
/// Ordered so that `Info < Warning < Error`, which lets callers rank or
/// filter findings with plain comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory context, including positive confirmations.
    Info,
    /// A condition worth operator attention that does not invalidate the bag.
    Warning,
    /// A rule violation. Any ERROR finding makes the owning result invalid.
    Error,
}

impl Severity {
    /// Returns the severity identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable machine-checkable category of a finding.
///
/// Codes are part of the report contract: consumers match on them, so a
/// code is never renamed or reused for a different condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCode {
    // Profile conformance
    /// The bag has no `bagit.txt` declaration.
    DeclarationMissing,
    /// The declared BagIt version is not in the profile's accepted set.
    VersionNotAccepted,
    /// The bag's serialization does not satisfy the profile.
    SerializationNotAccepted,
    /// A tag required by the profile is absent from the bag metadata.
    RequiredTagMissing,
    /// A tag value is outside the profile's allowed value set.
    TagValueNotAllowed,
    /// A tag value does not match the profile's value pattern.
    TagValueMalformed,
    /// A non-repeatable tag occurs more than once.
    TagRepeated,

    // Payload structure
    /// A directory required by the payload profile does not exist.
    RequiredDirectoryMissing,
    /// A required directory is not covered by the allowed set.
    RequiredDirectoryNotAllowed,
    /// A payload file sits outside every allowed location.
    UnexpectedLocation,
    /// Two payload paths differ only in capitalization.
    CaseCollision,

    // Integrity
    /// The bag carries no payload manifest to check against.
    ManifestMissing,
    /// A computed checksum disagrees with the manifest value.
    ChecksumMismatch,
    /// A manifest entry resolves to no payload file.
    FileMissing,
    /// A payload file appears in no manifest.
    FileOrphaned,
    /// The Payload-Oxum tag disagrees with the payload on disk.
    PayloadOxumMismatch,
    /// A file exists but could not be read.
    FileUnreadable,

    // File format
    /// No format could be identified for a file.
    FormatUnknown,
    /// The plugin does not validate the identified format.
    FormatUnsupported,
    /// The file was skipped under the skip-unsupported policy.
    FormatNotChecked,
    /// The file conforms to its identified format.
    FormatWellFormed,
    /// The file violates its identified format.
    FormatMalformed,
    /// The plugin performed only a heuristic check.
    HeuristicOnly,
    /// A diagnostic message passed through from the external tool.
    ToolReport,
    /// The external tool crashed, timed out, or returned garbage.
    ToolFailure,
}

impl FindingCode {
    /// Returns the wire identifier of the code, matching its serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeclarationMissing => "declaration_missing",
            Self::VersionNotAccepted => "version_not_accepted",
            Self::SerializationNotAccepted => "serialization_not_accepted",
            Self::RequiredTagMissing => "required_tag_missing",
            Self::TagValueNotAllowed => "tag_value_not_allowed",
            Self::TagValueMalformed => "tag_value_malformed",
            Self::TagRepeated => "tag_repeated",
            Self::RequiredDirectoryMissing => "required_directory_missing",
            Self::RequiredDirectoryNotAllowed => "required_directory_not_allowed",
            Self::UnexpectedLocation => "unexpected_location",
            Self::CaseCollision => "case_collision",
            Self::ManifestMissing => "manifest_missing",
            Self::ChecksumMismatch => "checksum_mismatch",
            Self::FileMissing => "file_missing",
            Self::FileOrphaned => "file_orphaned",
            Self::PayloadOxumMismatch => "payload_oxum_mismatch",
            Self::FileUnreadable => "file_unreadable",
            Self::FormatUnknown => "format_unknown",
            Self::FormatUnsupported => "format_unsupported",
            Self::FormatNotChecked => "format_not_checked",
            Self::FormatWellFormed => "format_well_formed",
            Self::FormatMalformed => "format_malformed",
            Self::HeuristicOnly => "heuristic_only",
            Self::ToolReport => "tool_report",
            Self::ToolFailure => "tool_failure",
        }
    }
}

impl std::fmt::Display for FindingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported issue or confirmation.
///
/// Immutable once created. The `subject` names what the finding concerns:
/// a bag-relative file path, a metadata tag, or a profile rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity rank of this finding.
    pub severity: Severity,
    /// Stable machine-checkable category.
    pub code: FindingCode,
    /// Human-readable description.
    pub message: String,
    /// File path, tag name, or rule the finding concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Finding {
    /// Create a finding with no subject.
    pub fn new(severity: Severity, code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            subject: None,
        }
    }

    /// Create an ERROR finding.
    pub fn error(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a WARNING finding.
    pub fn warning(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Create an INFO finding.
    pub fn info(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Attach the subject this finding concerns.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Whether this finding invalidates its result.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subject {
            Some(subject) => {
                write!(f, "[{}] {} ({}): {}", self.severity, self.code, subject, self.message)
            }
            None => write!(f, "[{}] {}: {}", self.severity, self.code, self.message),
        }
    }
}
