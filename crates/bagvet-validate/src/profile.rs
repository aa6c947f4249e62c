//! # Profile Validator
//!
//! Evaluates a bag's metadata against a bag profile: declaration,
//! accepted versions, serialization acceptance, and per-tag constraints.
//! Every unmet requirement is one ERROR finding naming the tag and the
//! expected constraint; the validator never aborts on nonconformance.

use std::collections::BTreeMap;

use regex::Regex;

use bagvet_core::{Bag, BagvetError, Finding, FindingCode, ValidationResult};
use bagvet_profile::{BagProfile, SerializationPolicy, TagSpec};

/// Metadata conformance validator.
///
/// Value patterns are compiled once at construction; a profile carrying
/// an invalid pattern is a configuration error, not a bag verdict.
#[derive(Debug)]
pub struct ProfileValidator {
    profile: BagProfile,
    patterns: BTreeMap<String, Regex>,
}

impl ProfileValidator {
    /// Build the validator, compiling every tag value pattern.
    ///
    /// # Errors
    ///
    /// `BagvetError::Configuration` when a pattern in the profile does
    /// not compile.
    pub fn new(profile: BagProfile) -> Result<Self, BagvetError> {
        let mut patterns = BTreeMap::new();
        for (tag, spec) in &profile.bag_info {
            if let Some(pattern) = &spec.pattern {
                let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                    BagvetError::configuration(format!(
                        "profile pattern for tag '{tag}' does not compile: {e}"
                    ))
                })?;
                patterns.insert(tag.clone(), compiled);
            }
        }
        Ok(Self { profile, patterns })
    }

    /// The profile this validator evaluates.
    pub fn profile(&self) -> &BagProfile {
        &self.profile
    }

    /// Evaluate the bag's metadata. Nonconformance is reported as
    /// findings; this method itself cannot fail.
    pub fn validate_bag(&self, bag: &Bag) -> ValidationResult {
        let mut result = ValidationResult::new();

        self.check_declaration(bag, &mut result);
        self.check_serialization(&mut result);
        for (tag, spec) in &self.profile.bag_info {
            self.check_tag(bag, tag, spec, &mut result);
        }

        tracing::debug!(
            bag = %bag.root().display(),
            errors = result.error_count(),
            "profile validation finished"
        );
        result
    }

    fn check_declaration(&self, bag: &Bag, result: &mut ValidationResult) {
        let Some(declaration) = bag.declaration() else {
            result.record(
                Finding::error(
                    FindingCode::DeclarationMissing,
                    "bag has no bagit.txt declaration",
                )
                .with_subject("bagit.txt"),
            );
            return;
        };

        if self.profile.accept_bagit_version.is_empty() {
            return;
        }
        let version = declaration.version.as_deref().unwrap_or("");
        if !self
            .profile
            .accept_bagit_version
            .iter()
            .any(|accepted| accepted == version)
        {
            result.record(
                Finding::error(
                    FindingCode::VersionNotAccepted,
                    format!(
                        "declared version '{version}' is not among accepted versions [{}]",
                        self.profile.accept_bagit_version.join(", ")
                    ),
                )
                .with_subject("BagIt-Version"),
            );
        }
    }

    fn check_serialization(&self, result: &mut ValidationResult) {
        // Validation targets are extracted directory bags, so a profile
        // demanding a serialized bag can never be satisfied here.
        if self.profile.serialization == SerializationPolicy::Required {
            result.record(
                Finding::error(
                    FindingCode::SerializationNotAccepted,
                    "profile requires a serialized bag, but the target is a directory",
                )
                .with_subject("Serialization"),
            );
        }
    }

    fn check_tag(&self, bag: &Bag, tag: &str, spec: &TagSpec, result: &mut ValidationResult) {
        let values = bag.tag_values(tag);

        if values.is_empty() {
            if spec.required {
                result.record(
                    Finding::error(
                        FindingCode::RequiredTagMissing,
                        format!("required tag '{tag}' is not present in bag-info.txt"),
                    )
                    .with_subject(tag),
                );
            }
            return;
        }

        if !spec.repeatable && values.len() > 1 {
            result.record(
                Finding::error(
                    FindingCode::TagRepeated,
                    format!("tag '{tag}' occurs {} times but is not repeatable", values.len()),
                )
                .with_subject(tag),
            );
        }

        for value in &values {
            if !spec.values.is_empty() && !spec.values.iter().any(|allowed| allowed == value) {
                result.record(
                    Finding::error(
                        FindingCode::TagValueNotAllowed,
                        format!(
                            "value '{value}' is not among allowed values [{}]",
                            spec.values.join(", ")
                        ),
                    )
                    .with_subject(tag),
                );
            }
            if let Some(pattern) = self.patterns.get(tag) {
                if !pattern.is_match(value) {
                    result.record(
                        Finding::error(
                            FindingCode::TagValueMalformed,
                            format!(
                                "value '{value}' does not match pattern '{}'",
                                spec.pattern.as_deref().unwrap_or_default()
                            ),
                        )
                        .with_subject(tag),
                    );
                }
            }
        }
    }
}
