//! # Validation Results
//!
//! The output of one validator invocation: a validity flag plus the
//! ordered sequence of findings that produced it.
//!
//! ## Invariant
//!
//! `valid` is true exactly when no ERROR-severity finding is present.
//! The field is private and recomputed on every insertion and merge, so
//! the flag and the finding list cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, Severity};

/// The outcome of a single validator run.
///
/// Created and owned by the validator that produced it; read-only to the
/// caller thereafter. Merging concatenates finding sequences in call
/// order and ANDs the validity flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    valid: bool,
    findings: Vec<Finding>,
}

impl ValidationResult {
    /// An empty, valid result.
    pub fn new() -> Self {
        Self {
            valid: true,
            findings: Vec::new(),
        }
    }

    /// Build a result from a finding sequence, deriving validity.
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let valid = !findings.iter().any(Finding::is_error);
        Self { valid, findings }
    }

    /// Record one finding, downgrading validity if it is an ERROR.
    pub fn record(&mut self, finding: Finding) {
        if finding.is_error() {
            self.valid = false;
        }
        self.findings.push(finding);
    }

    /// Absorb another result: findings append in order, validity ANDs.
    pub fn merge(&mut self, other: ValidationResult) {
        self.valid &= other.valid;
        self.findings.extend(other.findings);
    }

    /// Whether the run produced no ERROR finding.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The findings in the order they were recorded.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Findings at exactly the given severity.
    pub fn findings_at(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// Number of ERROR findings.
    pub fn error_count(&self) -> usize {
        self.findings_at(Severity::Error).count()
    }

    /// Consumes self and returns the finding sequence.
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Finding> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        Self::from_findings(iter.into_iter().collect())
    }
}
