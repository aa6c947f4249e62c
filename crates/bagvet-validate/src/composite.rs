//! # Composite Validator
//!
//! The single entry point: runs a configured subset of validators
//! against one bag, in caller order, and merges their results into one
//! aggregate report with a per-kind breakdown for traceability.
//!
//! A validator kind that is not configured is simply omitted; absence
//! is never reported as a failure.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use bagvet_core::{Bag, BagvetError, Finding, ValidationResult};

use crate::file_format::FileFormatValidator;
use crate::file_integrity::{ChecksumExpectation, FileIntegrityValidator};
use crate::payload_integrity::PayloadIntegrityValidator;
use crate::payload_structure::PayloadStructureValidator;
use crate::profile::ProfileValidator;

/// The validator kinds the façade can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Metadata conformance against a bag profile.
    Profile,
    /// Directory layout against a payload profile.
    PayloadStructure,
    /// Manifest completeness and checksum agreement.
    PayloadIntegrity,
    /// Caller-supplied per-file checksum expectations.
    FileIntegrity,
    /// Per-file format identification and conformance.
    FileFormat,
}

impl ValidatorKind {
    /// Stable identifier used in reports and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::PayloadStructure => "payload_structure",
            Self::PayloadIntegrity => "payload_integrity",
            Self::FileIntegrity => "file_integrity",
            Self::FileFormat => "file_format",
        }
    }
}

impl std::fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured validation step.
enum Step {
    Profile(ProfileValidator),
    PayloadStructure(PayloadStructureValidator),
    PayloadIntegrity(PayloadIntegrityValidator),
    FileIntegrity(Vec<ChecksumExpectation>),
    FileFormat(FileFormatValidator),
}

impl Step {
    fn kind(&self) -> ValidatorKind {
        match self {
            Self::Profile(_) => ValidatorKind::Profile,
            Self::PayloadStructure(_) => ValidatorKind::PayloadStructure,
            Self::PayloadIntegrity(_) => ValidatorKind::PayloadIntegrity,
            Self::FileIntegrity(_) => ValidatorKind::FileIntegrity,
            Self::FileFormat(_) => ValidatorKind::FileFormat,
        }
    }
}

/// The aggregate outcome of one composite run.
///
/// Serializes to the report contract: overall validity, the ordered
/// aggregate finding sequence, and the per-kind breakdown in run order.
#[derive(Debug, Serialize)]
pub struct BagReport {
    /// Unique id of this run.
    pub report_id: Uuid,
    /// When the report was assembled, UTC.
    pub generated_at: DateTime<Utc>,
    /// The bag the report concerns.
    pub bag: PathBuf,
    /// AND over every constituent result.
    pub valid: bool,
    /// Findings of all steps, concatenated in run order.
    pub findings: Vec<Finding>,
    /// Per-kind results, preserving run order.
    #[serde(serialize_with = "serialize_by_kind")]
    pub by_kind: Vec<(ValidatorKind, ValidationResult)>,
}

impl BagReport {
    /// The result of one kind, if that kind was configured.
    pub fn result_for(&self, kind: ValidatorKind) -> Option<&ValidationResult> {
        self.by_kind
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, result)| result)
    }
}

fn serialize_by_kind<S: Serializer>(
    by_kind: &[(ValidatorKind, ValidationResult)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(by_kind.len()))?;
    for (kind, result) in by_kind {
        map.serialize_entry(kind.as_str(), result)?;
    }
    map.end()
}

/// The façade: a caller-ordered list of configured validators.
///
/// Configuration-time failures (unloadable profile, bad pattern,
/// missing plugin executable) surface while the façade is being built,
/// before any bag is touched.
#[derive(Default)]
pub struct CompositeValidator {
    steps: Vec<Step>,
}

impl CompositeValidator {
    /// A façade with no steps configured. Validating with it yields an
    /// empty, valid report.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a profile validation step.
    pub fn with_profile(mut self, validator: ProfileValidator) -> Self {
        self.steps.push(Step::Profile(validator));
        self
    }

    /// Append a payload-structure validation step.
    pub fn with_payload_structure(mut self, validator: PayloadStructureValidator) -> Self {
        self.steps.push(Step::PayloadStructure(validator));
        self
    }

    /// Append a payload-integrity validation step.
    pub fn with_payload_integrity(mut self, validator: PayloadIntegrityValidator) -> Self {
        self.steps.push(Step::PayloadIntegrity(validator));
        self
    }

    /// Append a file-integrity step over caller-declared expectations.
    pub fn with_file_integrity(mut self, expectations: Vec<ChecksumExpectation>) -> Self {
        self.steps.push(Step::FileIntegrity(expectations));
        self
    }

    /// Append a file-format validation step.
    pub fn with_file_format(mut self, validator: FileFormatValidator) -> Self {
        self.steps.push(Step::FileFormat(validator));
        self
    }

    /// The kinds configured, in run order.
    pub fn kinds(&self) -> Vec<ValidatorKind> {
        self.steps.iter().map(Step::kind).collect()
    }

    /// Open the bag and run every configured step in order.
    ///
    /// # Errors
    ///
    /// `BagvetError::Io` when the bag root is unreadable and
    /// `BagvetError::Configuration` when a step discovers it cannot run
    /// at all (e.g. an unsupported manifest algorithm). In both cases no
    /// report is produced; "could not validate" is distinct from
    /// "invalid".
    pub fn validate(&self, bag_path: &Path) -> Result<BagReport, BagvetError> {
        let bag = Bag::open(bag_path)?;
        tracing::info!(
            bag = %bag_path.display(),
            steps = self.steps.len(),
            "starting composite validation"
        );

        let mut by_kind: Vec<(ValidatorKind, ValidationResult)> = Vec::new();
        for step in &self.steps {
            let result = self.run_step(step, &bag)?;
            by_kind.push((step.kind(), result));
        }

        let valid = by_kind.iter().all(|(_, result)| result.is_valid());
        let findings = by_kind
            .iter()
            .flat_map(|(_, result)| result.findings().iter().cloned())
            .collect();

        Ok(BagReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            bag: bag_path.to_path_buf(),
            valid,
            findings,
            by_kind,
        })
    }

    fn run_step(&self, step: &Step, bag: &Bag) -> Result<ValidationResult, BagvetError> {
        match step {
            Step::Profile(validator) => Ok(validator.validate_bag(bag)),
            Step::PayloadStructure(validator) => Ok(validator.validate_bag(bag)),
            Step::PayloadIntegrity(validator) => validator.validate_bag(bag),
            Step::FileIntegrity(expectations) => {
                let mut result = ValidationResult::new();
                for expectation in expectations {
                    let validator = FileIntegrityValidator::new(expectation.algorithm);
                    let file_result =
                        validator.validate_file(&bag.resolve(&expectation.path), &expectation.checksum);
                    // Re-subject onto the bag-relative path for report
                    // consistency.
                    for finding in file_result.into_findings() {
                        result.record(finding.with_subject(expectation.path.clone()));
                    }
                }
                Ok(result)
            }
            Step::FileFormat(validator) => validator.validate_bag(bag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagvet_core::{ChecksumAlgorithm, FindingCode};
    use bagvet_plugin::ExtensionPlugin;
    use bagvet_profile::{BagProfile, PayloadProfile, ProfileFormat};
    use std::fs;
    use std::sync::Arc;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn conforming_bag(root: &Path) {
        write(root, "bagit.txt", "BagIt-Version: 1.0\n");
        write(root, "bag-info.txt", "Source-Organization: State Archive\n");
        write(root, "data/docs/report.xml", "<report/>");
        let manifest = format!(
            "{}  data/docs/report.xml\n",
            ChecksumAlgorithm::Sha256.hash_bytes(b"<report/>"),
        );
        write(root, "manifest-sha256.txt", &manifest);
    }

    fn full_facade() -> CompositeValidator {
        let bag_profile = BagProfile::from_str(
            r#"{"Bag-Info": {"Source-Organization": {"required": true}}}"#,
            ProfileFormat::Json,
        )
        .unwrap();
        let payload_profile = PayloadProfile::from_str(
            r#"{"Payload-Folders-Allowed": ["docs/"]}"#,
            ProfileFormat::Json,
        )
        .unwrap();

        CompositeValidator::new()
            .with_profile(ProfileValidator::new(bag_profile).unwrap())
            .with_payload_structure(PayloadStructureValidator::new(payload_profile).unwrap())
            .with_payload_integrity(PayloadIntegrityValidator::new())
            .with_file_format(FileFormatValidator::new(Arc::new(ExtensionPlugin::new())))
    }

    #[test]
    fn test_conforming_bag_yields_valid_report() {
        let dir = tempfile::tempdir().unwrap();
        conforming_bag(dir.path());

        let report = full_facade().validate(dir.path()).unwrap();
        assert!(report.valid, "findings: {:?}", report.findings);
        assert_eq!(report.by_kind.len(), 4);
    }

    #[test]
    fn test_breakdown_localizes_the_failing_kind() {
        let dir = tempfile::tempdir().unwrap();
        conforming_bag(dir.path());
        write(dir.path(), "data/docs/report.xml", "tampered");

        let report = full_facade().validate(dir.path()).unwrap();
        assert!(!report.valid);
        assert!(!report
            .result_for(ValidatorKind::PayloadIntegrity)
            .unwrap()
            .is_valid());
        assert!(report.result_for(ValidatorKind::Profile).unwrap().is_valid());
    }

    #[test]
    fn test_unconfigured_kind_is_omitted_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        conforming_bag(dir.path());

        let facade =
            CompositeValidator::new().with_payload_integrity(PayloadIntegrityValidator::new());
        let report = facade.validate(dir.path()).unwrap();
        assert!(report.valid);
        assert_eq!(report.by_kind.len(), 1);
        assert!(report.result_for(ValidatorKind::Profile).is_none());
    }

    #[test]
    fn test_findings_follow_run_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/docs/report.xml", "<report/>");
        // No declaration and no manifest: both the profile step and the
        // integrity step produce findings, in step order.
        let bag_profile = BagProfile::from_str("{}", ProfileFormat::Json).unwrap();
        let facade = CompositeValidator::new()
            .with_profile(ProfileValidator::new(bag_profile).unwrap())
            .with_payload_integrity(PayloadIntegrityValidator::new());

        let report = facade.validate(dir.path()).unwrap();
        let codes: Vec<FindingCode> = report.findings.iter().map(|f| f.code).collect();
        assert_eq!(
            codes,
            [FindingCode::DeclarationMissing, FindingCode::ManifestMissing]
        );
    }

    #[test]
    fn test_file_integrity_expectations_step() {
        let dir = tempfile::tempdir().unwrap();
        conforming_bag(dir.path());

        let facade = CompositeValidator::new().with_file_integrity(vec![ChecksumExpectation {
            path: "data/docs/report.xml".into(),
            algorithm: ChecksumAlgorithm::Sha256,
            checksum: ChecksumAlgorithm::Sha256.hash_bytes(b"something else"),
        }]);
        let report = facade.validate(dir.path()).unwrap();
        assert!(!report.valid);
        assert_eq!(
            report.findings[0].subject.as_deref(),
            Some("data/docs/report.xml")
        );
    }

    #[test]
    fn test_unreadable_bag_root_aborts_without_report() {
        let err = full_facade().validate(Path::new("/nonexistent/bag")).unwrap_err();
        assert!(matches!(err, BagvetError::Io { .. }));
    }

    #[test]
    fn test_report_serializes_to_contract_shape() {
        let dir = tempfile::tempdir().unwrap();
        conforming_bag(dir.path());

        let report = full_facade().validate(dir.path()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["valid"].as_bool().unwrap());
        assert!(json["findings"].is_array());
        assert!(json["by_kind"]["profile"]["valid"].as_bool().unwrap());
        assert!(json["by_kind"]["file_format"]["findings"].is_array());
        assert!(json["report_id"].is_string());
    }

    #[test]
    fn test_empty_facade_yields_empty_valid_report() {
        let dir = tempfile::tempdir().unwrap();
        conforming_bag(dir.path());

        let report = CompositeValidator::new().validate(dir.path()).unwrap();
        assert!(report.valid);
        assert!(report.findings.is_empty());
        assert!(report.by_kind.is_empty());
    }
}
