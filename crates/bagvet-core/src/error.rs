//! # Error Types
//!
//! The typed failures for conditions under which a check cannot even be
//! attempted. All errors use `thiserror` for derive-based `Display` and
//! `Error` implementations.
//!
//! ## Two-Tier Design
//!
//! Expected nonconformance (a bag failing a rule) is reported as a
//! `Finding` inside a `ValidationResult` and never travels through this
//! module. Only three failure classes exist:
//!
//! - `Configuration`: bad or missing profile, misconfigured plugin or
//!   executable, unsupported checksum algorithm. Surfaces at setup and
//!   aborts the run; there is nothing valid to report against.
//! - `Io`: unreadable bag root or file. At the level of one file this is
//!   caught and converted into an ERROR finding; at the level of the bag
//!   root it aborts the run.
//! - `Plugin`: external tool crash, timeout, or malformed output. Caught
//!   per file and converted into an ERROR finding.
//!
//! Callers can therefore always distinguish "bag is invalid" (a result
//! with findings) from "validation could not be completed" (an error).

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the bagvet stack.
#[derive(Error, Debug)]
pub enum BagvetError {
    /// The validator or plugin setup is unusable.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A path could not be read.
    #[error("io error at '{}': {source}", path.display())]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying io failure.
        #[source]
        source: std::io::Error,
    },

    /// A format plugin failed in a way that is not a verdict on the file.
    #[error("plugin '{plugin}' failed: {reason}")]
    Plugin {
        /// Name of the failing plugin.
        plugin: String,
        /// Crash, timeout, or malformed-output description.
        reason: String,
    },
}

impl BagvetError {
    /// Configuration failure with the given reason.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Io failure for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Plugin failure for the named backend.
    pub fn plugin(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole run rather than one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
