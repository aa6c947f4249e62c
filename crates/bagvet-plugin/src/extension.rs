//! # Extension Reference Plugin
//!
//! The minimal reference backend: identifies a format purely from the
//! file-name suffix and performs no deep structural validation. It is
//! the executable specification of the plugin interface, and the
//! backend of choice for tests that must not depend on external
//! processes.

use std::path::Path;

use bagvet_core::{BagvetError, Finding, FindingCode, ValidationResult};

use crate::interface::{
    FormatIdentification, FormatPlugin, IdentificationEvidence, PluginDescriptor,
};
use crate::media;

/// Name-suffix identification, plausibility-only validation.
#[derive(Debug)]
pub struct ExtensionPlugin {
    descriptor: PluginDescriptor,
}

impl ExtensionPlugin {
    /// Create the reference plugin.
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor {
                name: "extension".into(),
                summary: "file-name-suffix format identification, no deep validation".into(),
                description: "Identifies formats from a static extension table and performs \
                              no structural checks. Every validation verdict is heuristic; \
                              production runs should prefer a deep-validation backend."
                    .into(),
                default_formats: media::known_media_types(),
            },
        }
    }
}

impl Default for ExtensionPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatPlugin for ExtensionPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn identify(&self, path: &Path) -> Result<FormatIdentification, BagvetError> {
        if !path.is_file() {
            return Err(BagvetError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }
        let media_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(media::media_type_for_extension);
        Ok(match media_type {
            Some(media_type) => {
                FormatIdentification::identified(path, media_type, IdentificationEvidence::Extension)
            }
            None => FormatIdentification::unknown(path),
        })
    }

    fn validate(&self, path: &Path, media_type: &str) -> Result<ValidationResult, BagvetError> {
        let mut result = ValidationResult::new();

        if !self.descriptor.supports(media_type) {
            result.record(
                Finding::info(
                    FindingCode::FormatUnsupported,
                    format!("'{media_type}' is outside this plugin's format table"),
                )
                .with_subject(path.display().to_string()),
            );
            return Ok(result);
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let plausible = matches!(
            (&extension, media::extensions_for(media_type)),
            (Some(ext), Some(extensions)) if extensions.contains(&ext.as_str())
        );

        let message = if plausible {
            format!("extension matches '{media_type}'; no structural check performed")
        } else {
            format!(
                "extension {} is not typical for '{media_type}'; no structural check performed",
                extension.as_deref().unwrap_or("(none)")
            )
        };
        result.record(
            Finding::info(FindingCode::HeuristicOnly, message)
                .with_subject(path.display().to_string()),
        );
        Ok(result)
    }
}
