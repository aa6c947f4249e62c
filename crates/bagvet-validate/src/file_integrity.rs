//! # File Integrity Validator
//!
//! Checks one file against one declared checksum. Used standalone for
//! spot checks and by the composite façade for caller-supplied
//! expectation lists.

use std::path::Path;

use serde::{Deserialize, Serialize};

use bagvet_core::{ChecksumAlgorithm, Finding, FindingCode, ValidationResult};

/// A caller-declared checksum for one bag-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumExpectation {
    /// Bag-relative path of the file, manifest form.
    pub path: String,
    /// Algorithm the declared checksum was computed with.
    pub algorithm: ChecksumAlgorithm,
    /// Declared checksum, lowercase hex.
    pub checksum: String,
}

/// Single-file checksum validator.
#[derive(Debug, Clone, Copy)]
pub struct FileIntegrityValidator {
    algorithm: ChecksumAlgorithm,
}

impl FileIntegrityValidator {
    /// Validator computing with the given algorithm.
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this validator computes with.
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Compare the file's computed checksum against the declared value.
    ///
    /// An unreadable file is converted into a `file_unreadable` ERROR
    /// finding; the check is the file, so there is nothing coarser to
    /// abort.
    pub fn validate_file(&self, path: &Path, declared: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        let subject = path.display().to_string();

        let computed = match self.algorithm.hash_file(path) {
            Ok(computed) => computed,
            Err(e) => {
                result.record(
                    Finding::error(FindingCode::FileUnreadable, e.to_string())
                        .with_subject(subject),
                );
                return result;
            }
        };

        let declared = declared.to_ascii_lowercase();
        if computed != declared {
            result.record(
                Finding::error(
                    FindingCode::ChecksumMismatch,
                    format!("{} declared {declared}, computed {computed}", self.algorithm),
                )
                .with_subject(subject),
            );
        }
        result
    }
}
