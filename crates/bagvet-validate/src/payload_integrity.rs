//! # Payload Integrity Validator
//!
//! Recomputes manifest checksums and checks manifest completeness in
//! both directions: every manifest entry must resolve to a payload file
//! (missing-file) and every payload file must appear in a manifest
//! (orphan-file). The `Payload-Oxum` tag, when present, is cross-checked
//! against the payload on disk.
//!
//! Completeness is evaluated over the union of all manifests, so a file
//! listed in several manifests that is gone from disk yields exactly one
//! missing-file finding; checksum agreement is evaluated per manifest
//! entry, carrying the algorithm in the finding.

use std::collections::BTreeSet;

use bagvet_core::{Bag, BagvetError, Finding, FindingCode, ValidationResult};

/// Checksum and completeness validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadIntegrityValidator;

impl PayloadIntegrityValidator {
    /// Create the validator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate manifest conformance of the bag's payload.
    ///
    /// Per-file read failures are converted into findings at file
    /// granularity so the rest of the payload is still checked.
    ///
    /// # Errors
    ///
    /// `BagvetError::Configuration` when the bag carries a manifest
    /// whose algorithm is unsupported; skipping it silently would turn
    /// an unverifiable bag into a passing one.
    pub fn validate_bag(&self, bag: &Bag) -> Result<ValidationResult, BagvetError> {
        if !bag.unknown_manifest_algorithms().is_empty() {
            return Err(BagvetError::configuration(format!(
                "bag declares manifests with unsupported algorithms: {}",
                bag.unknown_manifest_algorithms().join(", ")
            )));
        }

        let mut result = ValidationResult::new();

        if bag.manifests().is_empty() {
            result.record(
                Finding::error(
                    FindingCode::ManifestMissing,
                    "bag carries no payload manifest",
                )
                .with_subject("manifest"),
            );
            return Ok(result);
        }

        let payload_files = match bag.payload_files() {
            Ok(files) => files,
            Err(e) => {
                result.record(
                    Finding::error(FindingCode::FileUnreadable, e.to_string())
                        .with_subject("data"),
                );
                return Ok(result);
            }
        };
        let on_disk: BTreeSet<String> =
            payload_files.iter().map(|f| bag.relative_path(f)).collect();

        self.check_completeness(bag, &on_disk, &mut result);
        self.check_checksums(bag, &mut result);
        self.check_payload_oxum(bag, &payload_files, &mut result);

        tracing::debug!(
            bag = %bag.root().display(),
            files = on_disk.len(),
            errors = result.error_count(),
            "payload integrity validation finished"
        );
        Ok(result)
    }

    /// Missing-file and orphan-file detection over the manifest union.
    fn check_completeness(
        &self,
        bag: &Bag,
        on_disk: &BTreeSet<String>,
        result: &mut ValidationResult,
    ) {
        let mut listed: BTreeSet<&str> = BTreeSet::new();
        for manifest in bag.manifests().values() {
            for entry in &manifest.entries {
                listed.insert(entry.path.as_str());
            }
        }

        for path in &listed {
            if !on_disk.contains(*path) {
                result.record(
                    Finding::error(
                        FindingCode::FileMissing,
                        "file is listed in a manifest but absent from the payload",
                    )
                    .with_subject(*path),
                );
            }
        }
        for path in on_disk {
            if !listed.contains(path.as_str()) {
                result.record(
                    Finding::error(
                        FindingCode::FileOrphaned,
                        "file is present in the payload but listed in no manifest",
                    )
                    .with_subject(path.as_str()),
                );
            }
        }
    }

    /// Recompute every manifest entry whose file exists.
    fn check_checksums(&self, bag: &Bag, result: &mut ValidationResult) {
        for manifest in bag.manifests().values() {
            for entry in &manifest.entries {
                let path = bag.resolve(&entry.path);
                if !path.is_file() {
                    // Already reported by the completeness pass.
                    continue;
                }
                let computed = match manifest.algorithm.hash_file(&path) {
                    Ok(computed) => computed,
                    Err(e) => {
                        result.record(
                            Finding::error(FindingCode::FileUnreadable, e.to_string())
                                .with_subject(entry.path.as_str()),
                        );
                        continue;
                    }
                };
                if computed != entry.checksum {
                    result.record(
                        Finding::error(
                            FindingCode::ChecksumMismatch,
                            format!(
                                "{} manifest declares {}, computed {computed}",
                                manifest.algorithm, entry.checksum
                            ),
                        )
                        .with_subject(entry.path.as_str()),
                    );
                }
            }
        }
    }

    fn check_payload_oxum(
        &self,
        bag: &Bag,
        payload_files: &[std::path::PathBuf],
        result: &mut ValidationResult,
    ) {
        let raw = match bag.tag_values("Payload-Oxum").into_iter().next() {
            Some(raw) => raw.to_string(),
            None => return,
        };
        let Some(declared) = bagvet_core::PayloadOxum::parse(&raw) else {
            result.record(
                Finding::error(
                    FindingCode::PayloadOxumMismatch,
                    format!("Payload-Oxum value '{raw}' is not of the form <octets>.<streams>"),
                )
                .with_subject("Payload-Oxum"),
            );
            return;
        };

        let mut octets: u64 = 0;
        for file in payload_files {
            match std::fs::metadata(file) {
                Ok(metadata) => octets += metadata.len(),
                Err(e) => {
                    result.record(
                        Finding::error(
                            FindingCode::FileUnreadable,
                            format!("cannot stat payload file: {e}"),
                        )
                        .with_subject(bag.relative_path(file)),
                    );
                    return;
                }
            }
        }
        let streams = payload_files.len() as u64;
        if octets != declared.octet_count || streams != declared.stream_count {
            result.record(
                Finding::error(
                    FindingCode::PayloadOxumMismatch,
                    format!(
                        "Payload-Oxum declares {}.{}, payload holds {octets}.{streams}",
                        declared.octet_count, declared.stream_count
                    ),
                )
                .with_subject("Payload-Oxum"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagvet_core::ChecksumAlgorithm;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    /// A bag whose sha256 manifest matches its two payload files.
    fn sound_bag(root: &Path) {
        write(root, "bagit.txt", "BagIt-Version: 1.0\n");
        write(root, "data/a.txt", "alpha");
        write(root, "data/b.txt", "beta");
        let manifest = format!(
            "{}  data/a.txt\n{}  data/b.txt\n",
            ChecksumAlgorithm::Sha256.hash_bytes(b"alpha"),
            ChecksumAlgorithm::Sha256.hash_bytes(b"beta"),
        );
        write(root, "manifest-sha256.txt", &manifest);
    }

    #[test]
    fn test_sound_bag_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        let bag = Bag::open(dir.path()).unwrap();

        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        assert!(result.is_valid(), "findings: {:?}", result.findings());
    }

    #[test]
    fn test_checksum_mismatch_names_file_and_digests() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        write(dir.path(), "data/b.txt", "tampered");
        let bag = Bag::open(dir.path()).unwrap();

        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.error_count(), 1);

        let finding = &result.findings()[0];
        assert_eq!(finding.code, FindingCode::ChecksumMismatch);
        assert_eq!(finding.subject.as_deref(), Some("data/b.txt"));
        assert!(finding.message.contains(&ChecksumAlgorithm::Sha256.hash_bytes(b"beta")));
        assert!(finding.message.contains(&ChecksumAlgorithm::Sha256.hash_bytes(b"tampered")));
    }

    #[test]
    fn test_exactly_one_missing_finding_per_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        // List the same missing path in a second manifest as well.
        let md5 = format!(
            "{}  data/a.txt\n{}  data/b.txt\n",
            ChecksumAlgorithm::Md5.hash_bytes(b"alpha"),
            ChecksumAlgorithm::Md5.hash_bytes(b"beta"),
        );
        write(dir.path(), "manifest-md5.txt", &md5);
        fs::remove_file(dir.path().join("data/b.txt")).unwrap();
        let bag = Bag::open(dir.path()).unwrap();

        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        assert!(!result.is_valid());
        let missing: Vec<&Finding> = result
            .findings()
            .iter()
            .filter(|f| f.code == FindingCode::FileMissing)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].subject.as_deref(), Some("data/b.txt"));
    }

    #[test]
    fn test_orphan_file_is_distinct_code() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        write(dir.path(), "data/extra.txt", "stowaway");
        let bag = Bag::open(dir.path()).unwrap();

        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        assert!(!result.is_valid());
        let orphan = result
            .findings()
            .iter()
            .find(|f| f.code == FindingCode::FileOrphaned)
            .unwrap();
        assert_eq!(orphan.subject.as_deref(), Some("data/extra.txt"));
    }

    #[test]
    fn test_no_manifest_is_a_finding_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/a.txt", "alpha");
        let bag = Bag::open(dir.path()).unwrap();

        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.findings()[0].code, FindingCode::ManifestMissing);
    }

    #[test]
    fn test_unsupported_manifest_algorithm_aborts() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        write(dir.path(), "manifest-crc32.txt", "deadbeef  data/a.txt\n");
        let bag = Bag::open(dir.path()).unwrap();

        let err = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("crc32"));
    }

    #[test]
    fn test_payload_oxum_agreement_and_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        // "alpha" + "beta" is 9 octets across 2 streams.
        write(
            dir.path(),
            "bag-info.txt",
            "Payload-Oxum: 9.2\n",
        );
        let bag = Bag::open(dir.path()).unwrap();
        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        assert!(result.is_valid(), "findings: {:?}", result.findings());

        write(dir.path(), "bag-info.txt", "Payload-Oxum: 9.3\n");
        let bag = Bag::open(dir.path()).unwrap();
        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        assert!(result
            .findings()
            .iter()
            .any(|f| f.code == FindingCode::PayloadOxumMismatch));
    }

    #[test]
    fn test_second_manifest_checked_independently() {
        let dir = tempfile::tempdir().unwrap();
        sound_bag(dir.path());
        // md5 manifest with a deliberately wrong digest for a.txt.
        let md5 = format!(
            "{}  data/a.txt\n{}  data/b.txt\n",
            ChecksumAlgorithm::Md5.hash_bytes(b"wrong"),
            ChecksumAlgorithm::Md5.hash_bytes(b"beta"),
        );
        write(dir.path(), "manifest-md5.txt", &md5);
        let bag = Bag::open(dir.path()).unwrap();

        let result = PayloadIntegrityValidator::new().validate_bag(&bag).unwrap();
        let mismatches: Vec<&Finding> = result
            .findings()
            .iter()
            .filter(|f| f.code == FindingCode::ChecksumMismatch)
            .collect();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].message.starts_with("md5"));
    }
}
