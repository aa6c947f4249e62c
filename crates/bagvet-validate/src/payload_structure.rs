//! # Payload Structure Validator
//!
//! Evaluates the payload directory tree against a payload profile:
//! required directories must exist, required directories must be covered
//! by the allowed set, files may only sit under allowed locations, and
//! no two payload paths may differ only in capitalization.
//!
//! Rule paths are payload-relative (the `data/` prefix is stripped);
//! finding subjects are bag-relative, matching the manifest form.

use std::collections::HashMap;

use regex::Regex;

use bagvet_core::{Bag, BagvetError, Finding, FindingCode, ValidationResult};
use bagvet_profile::{PathRule, PayloadProfile};

/// A path rule compiled for matching payload-relative paths.
#[derive(Debug)]
enum CompiledRule {
    /// Literal directory prefix, normalized to a trailing slash.
    Literal(String),
    /// Prefix-anchored regex with its profile source.
    Regex { pattern: Regex, source: String },
}

impl CompiledRule {
    fn compile(rule: &PathRule) -> Result<Self, BagvetError> {
        match rule {
            PathRule::Literal(prefix) => {
                let mut prefix = prefix.clone();
                if !prefix.ends_with('/') {
                    prefix.push('/');
                }
                Ok(Self::Literal(prefix))
            }
            PathRule::Regex { regex } => {
                let pattern = Regex::new(&format!("^(?:{regex})")).map_err(|e| {
                    BagvetError::configuration(format!(
                        "payload profile pattern '{regex}' does not compile: {e}"
                    ))
                })?;
                Ok(Self::Regex {
                    pattern,
                    source: regex.clone(),
                })
            }
        }
    }

    /// Whether a payload-relative file path falls under this rule.
    fn covers(&self, path: &str) -> bool {
        match self {
            Self::Literal(prefix) => path.starts_with(prefix.as_str()),
            Self::Regex { pattern, .. } => pattern.is_match(path),
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::Literal(prefix) => prefix,
            Self::Regex { source, .. } => source,
        }
    }
}

/// Directory-layout conformance validator.
#[derive(Debug)]
pub struct PayloadStructureValidator {
    profile: PayloadProfile,
    required: Vec<CompiledRule>,
    allowed: Option<Vec<CompiledRule>>,
}

impl PayloadStructureValidator {
    /// Build the validator, compiling every rule pattern.
    ///
    /// # Errors
    ///
    /// `BagvetError::Configuration` when a rule pattern does not compile.
    pub fn new(profile: PayloadProfile) -> Result<Self, BagvetError> {
        let required = profile
            .required
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let allowed = profile
            .allowed
            .as_ref()
            .map(|rules| rules.iter().map(CompiledRule::compile).collect())
            .transpose()?;
        Ok(Self {
            profile,
            required,
            allowed,
        })
    }

    /// The profile this validator evaluates.
    pub fn profile(&self) -> &PayloadProfile {
        &self.profile
    }

    /// Evaluate the payload tree. Nonconformance is reported as
    /// findings; an unreadable payload walk is converted into a
    /// finding on the payload root so sibling validators can proceed.
    pub fn validate_bag(&self, bag: &Bag) -> ValidationResult {
        let mut result = ValidationResult::new();

        let files = match bag.payload_files() {
            Ok(files) => files,
            Err(e) => {
                result.record(
                    Finding::error(FindingCode::FileUnreadable, e.to_string())
                        .with_subject("data"),
                );
                return result;
            }
        };
        let relative: Vec<String> = files
            .iter()
            .map(|f| payload_relative(&bag.relative_path(f)))
            .collect();

        self.check_required_exist(bag, &relative, &mut result);
        self.check_required_are_allowed(&mut result);
        self.check_file_locations(&relative, &mut result);
        self.check_case_collisions(&relative, &mut result);

        tracing::debug!(
            bag = %bag.root().display(),
            files = relative.len(),
            errors = result.error_count(),
            "payload structure validation finished"
        );
        result
    }

    /// Every required rule must be satisfied by the tree: a literal by
    /// the directory existing, a regex by some payload path matching.
    fn check_required_exist(&self, bag: &Bag, relative: &[String], result: &mut ValidationResult) {
        for rule in &self.required {
            let satisfied = match rule {
                CompiledRule::Literal(prefix) => {
                    bag.payload_root().join(prefix.trim_end_matches('/')).is_dir()
                }
                CompiledRule::Regex { pattern, .. } => {
                    relative.iter().any(|path| pattern.is_match(path))
                }
            };
            if !satisfied {
                result.record(
                    Finding::new(
                        self.profile.severities.required_missing,
                        FindingCode::RequiredDirectoryMissing,
                        format!("required payload directory '{}' is not present", rule.source()),
                    )
                    .with_subject(rule.source()),
                );
            }
        }
    }

    /// A profile requiring a directory its allowed set excludes is
    /// contradictory; surface it against the profile rule itself.
    fn check_required_are_allowed(&self, result: &mut ValidationResult) {
        let Some(allowed) = &self.allowed else { return };
        for rule in &self.required {
            let CompiledRule::Literal(prefix) = rule else {
                continue;
            };
            let probe = format!("{prefix}x");
            if !allowed.iter().any(|a| a.covers(&probe)) {
                result.record(
                    Finding::error(
                        FindingCode::RequiredDirectoryNotAllowed,
                        format!(
                            "required payload directory '{prefix}' is not covered by \
                             Payload-Folders-Allowed"
                        ),
                    )
                    .with_subject(prefix.as_str()),
                );
            }
        }
    }

    fn check_file_locations(&self, relative: &[String], result: &mut ValidationResult) {
        let Some(allowed) = &self.allowed else { return };
        for path in relative {
            if !allowed.iter().any(|rule| rule.covers(path)) {
                result.record(
                    Finding::new(
                        self.profile.severities.unexpected_location,
                        FindingCode::UnexpectedLocation,
                        "file is outside every allowed payload location",
                    )
                    .with_subject(format!("data/{path}")),
                );
            }
        }
    }

    fn check_case_collisions(&self, relative: &[String], result: &mut ValidationResult) {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for path in relative {
            match seen.get(path.to_lowercase().as_str()) {
                Some(first) => {
                    result.record(
                        Finding::new(
                            self.profile.severities.case_collision,
                            FindingCode::CaseCollision,
                            format!("'data/{path}' and 'data/{first}' differ only in capitalization"),
                        )
                        .with_subject(format!("data/{path}")),
                    );
                }
                None => {
                    seen.insert(path.to_lowercase(), path);
                }
            }
        }
    }
}

/// Strip the leading `data/` component from a bag-relative path.
fn payload_relative(bag_relative: &str) -> String {
    bag_relative
        .strip_prefix("data/")
        .unwrap_or(bag_relative)
        .to_string()
}
