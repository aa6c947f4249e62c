//! # bagvet-cli
//!
//! Command-line front end for the bagvet validation stack.
//!
//! ## Subcommands
//!
//! - `validate`: run a configured set of validators against a bag and
//!   print the aggregate report as text or JSON.
//! - `plugins`: print the descriptors of the bundled format plugins.
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to the library crates; no validation logic here.
//! - Exit codes: 0 the bag is valid, 1 the bag is invalid, 2 validation
//!   could not be completed.

pub mod plugins;
pub mod validate;

/// Exit code for a valid bag.
pub const EXIT_VALID: u8 = 0;

/// Exit code for an invalid bag.
pub const EXIT_INVALID: u8 = 1;

/// Exit code when validation could not be completed.
pub const EXIT_ABORTED: u8 = 2;
