//! # bagvet-plugin
//!
//! The file-format plugin interface and the bundled backends. Format
//! identification and format-specific validation are delegated to
//! plugins so that heterogeneous backends, pure in-process heuristics
//! and wrapped external processes alike, satisfy one capability
//! contract and can be swapped without touching the validators.
//!
//! ## Bundled Backends
//!
//! - [`ExtensionPlugin`]: identifies from the file-name suffix and
//!   performs no deep validation. The interface's executable
//!   specification; tests that must not depend on external processes
//!   use it.
//! - [`JhovePlugin`]: identifies by magic-number sniffing with an
//!   extension fallback and validates out-of-process through the JHOVE
//!   object validation tool.
//!
//! ## Isolation Contract
//!
//! A plugin failure on one file is a typed `Plugin` error, which the
//! file-format validator converts into a single ERROR finding for that
//! file. One file's tool crash never aborts the batch.

pub mod extension;
pub mod interface;
pub mod jhove;
pub mod media;

pub use extension::ExtensionPlugin;
pub use interface::{
    FormatIdentification, FormatPlugin, IdentificationEvidence, PluginDescriptor,
};
pub use jhove::{JhoveConfig, JhovePlugin};
