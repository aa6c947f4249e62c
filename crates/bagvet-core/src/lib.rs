//! # bagvet-core
//!
//! Foundational types for the bagvet validation stack. This crate is the
//! leaf of the workspace DAG: every other crate depends on it and it
//! depends on nothing internal.
//!
//! ## Contents
//!
//! - **Bag access layer** (`bag`): read-only view of a BagIt bag on disk.
//!   Exposes the manifest entries, the metadata tag list, and the payload
//!   root. Never mutates the bag.
//! - **Finding/result model** (`finding`, `result`): the shared vocabulary
//!   every validator reports in. A `ValidationResult` is valid exactly
//!   when it carries no ERROR-severity finding; this invariant is
//!   maintained by construction and cannot be violated by downstream code.
//! - **Checksum engine** (`checksum`): the manifest hash algorithms with
//!   streaming file digestion.
//! - **Error hierarchy** (`error`): the typed failures for conditions
//!   under which a check cannot even be attempted. Expected nonconformance
//!   is never an error; it is a finding.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `bagvet-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public report-facing types derive `Debug`, `Clone`, `Serialize`.

pub mod bag;
pub mod checksum;
pub mod error;
pub mod finding;
pub mod result;

// Re-export primary types for ergonomic imports.
pub use bag::{Bag, BagDeclaration, Manifest, ManifestEntry, PayloadOxum, Tag};
pub use checksum::ChecksumAlgorithm;
pub use error::BagvetError;
pub use finding::{Finding, FindingCode, Severity};
pub use result::ValidationResult;
