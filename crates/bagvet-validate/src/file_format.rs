//! # File Format Validator
//!
//! Orchestrates per-file format identification and format-specific
//! validation across a bag's payload, delegating both to the selected
//! plugin. Files are processed in manifest order, with payload files
//! absent from every manifest appended in walk order; the order is
//! stable so reports are reproducible.
//!
//! ## Fault Isolation
//!
//! A plugin or read failure for one file becomes a single ERROR finding
//! for that file. Sibling files are always processed; one crashing tool
//! invocation never aborts the batch.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use bagvet_core::{Bag, BagvetError, Finding, FindingCode, ValidationResult};
use bagvet_plugin::FormatPlugin;

/// What to do with files whose identified format the plugin does not
/// claim to validate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatPolicy {
    /// Validate anyway; the plugin reports `format_unsupported`.
    #[default]
    CheckAll,
    /// Skip the plugin call and record `format_not_checked`.
    SkipUnsupported,
}

/// Per-file format conformance validator.
pub struct FileFormatValidator {
    plugin: Arc<dyn FormatPlugin>,
    policy: FormatPolicy,
    scope: Option<Regex>,
}

impl FileFormatValidator {
    /// Validator delegating to the given plugin, checking every payload
    /// file under the default check-all policy.
    pub fn new(plugin: Arc<dyn FormatPlugin>) -> Self {
        Self {
            plugin,
            policy: FormatPolicy::default(),
            scope: None,
        }
    }

    /// Select the unsupported-format policy.
    pub fn with_policy(mut self, policy: FormatPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restrict checking to bag-relative paths matching the pattern.
    ///
    /// # Errors
    ///
    /// `BagvetError::Configuration` when the pattern does not compile.
    pub fn with_scope(mut self, pattern: &str) -> Result<Self, BagvetError> {
        let compiled = Regex::new(pattern).map_err(|e| {
            BagvetError::configuration(format!("format scope pattern '{pattern}' does not compile: {e}"))
        })?;
        self.scope = Some(compiled);
        Ok(self)
    }

    /// The plugin this validator delegates to.
    pub fn plugin(&self) -> &dyn FormatPlugin {
        self.plugin.as_ref()
    }

    /// Validate every target payload file, merging per-file results.
    ///
    /// # Errors
    ///
    /// `BagvetError::Io` when the payload tree itself cannot be
    /// enumerated; per-file failures are findings, not errors.
    pub fn validate_bag(&self, bag: &Bag) -> Result<ValidationResult, BagvetError> {
        let mut result = ValidationResult::new();
        for relative in self.target_files(bag)? {
            let file_result = self.validate_file(bag, &relative);
            result.merge(file_result);
        }
        tracing::debug!(
            bag = %bag.root().display(),
            plugin = %self.plugin.descriptor().name,
            errors = result.error_count(),
            "file format validation finished"
        );
        Ok(result)
    }

    /// Identify and validate one payload file, isolating failures.
    ///
    /// Every finding is tagged with the bag-relative path as subject.
    pub fn validate_file(&self, bag: &Bag, relative: &str) -> ValidationResult {
        let path = bag.resolve(relative);
        let mut result = ValidationResult::new();

        let identification = match self.plugin.identify(&path) {
            Ok(identification) => identification,
            Err(e) => {
                result.record(Finding::error(failure_code(&e), e.to_string()));
                return tag_subjects(result, relative);
            }
        };

        let Some(media_type) = identification.media_type else {
            result.record(Finding::error(
                FindingCode::FormatUnknown,
                "no format could be identified",
            ));
            return tag_subjects(result, relative);
        };

        if self.policy == FormatPolicy::SkipUnsupported
            && !self.plugin.descriptor().supports(&media_type)
        {
            result.record(Finding::info(
                FindingCode::FormatNotChecked,
                format!("'{media_type}' is outside the plugin's format set; not checked"),
            ));
            return tag_subjects(result, relative);
        }

        match self.plugin.validate(&path, &media_type) {
            Ok(file_result) => result.merge(file_result),
            Err(e) => result.record(Finding::error(failure_code(&e), e.to_string())),
        }
        tag_subjects(result, relative)
    }

    /// Target files in manifest order, with unlisted payload files
    /// appended in walk order, filtered by the configured scope.
    fn target_files(&self, bag: &Bag) -> Result<Vec<String>, BagvetError> {
        let mut targets: Vec<String> = Vec::new();
        // The strongest manifest present drives the primary order.
        if let Some((_, manifest)) = bag.manifests().iter().next_back() {
            targets.extend(manifest.entries.iter().map(|e| e.path.clone()));
        }
        for file in bag.payload_files()? {
            let relative = bag.relative_path(&file);
            if !targets.contains(&relative) {
                targets.push(relative);
            }
        }
        // Manifest entries for absent files are the integrity
        // validator's concern, not a format target.
        targets.retain(|relative| bag.resolve(relative).is_file());
        if let Some(scope) = &self.scope {
            targets.retain(|relative| scope.is_match(relative));
        }
        Ok(targets)
    }
}

/// Map a per-file failure to its finding code.
fn failure_code(error: &BagvetError) -> FindingCode {
    match error {
        BagvetError::Io { .. } => FindingCode::FileUnreadable,
        _ => FindingCode::ToolFailure,
    }
}

/// Tag every finding with the bag-relative file path. Plugins subject
/// their findings with the path they were handed; in a bag run the
/// manifest form is the canonical name for the file.
fn tag_subjects(result: ValidationResult, relative: &str) -> ValidationResult {
    result
        .into_findings()
        .into_iter()
        .map(|finding| finding.with_subject(relative))
        .collect()
}
