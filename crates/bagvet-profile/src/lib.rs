//! # bagvet-profile
//!
//! Profile documents for the bagvet validation stack. A profile is data
//! supplied by the caller: a declarative description of what a conforming
//! bag looks like. Two document kinds exist:
//!
//! - **Bag profile** (`bag_profile`): metadata conformance rules for the
//!   tag file, accepted BagIt versions, serialization acceptance, and an
//!   optional reference to a payload profile.
//! - **Payload profile** (`payload_profile`): required and allowed
//!   payload directory rules, literal or regex, with per-rule severity
//!   overrides.
//!
//! ## Loading Contract
//!
//! Profiles load from JSON or YAML, from a local path or through the
//! [`ProfileFetcher`] seam for remote sources. Every document is
//! validated against its bundled JSON Schema before deserialization; a
//! document that fails is a `Configuration` error carrying the violation
//! list, because there is nothing meaningful to validate a bag against.
//! Profiles are immutable once loaded.

pub mod bag_profile;
pub mod payload_profile;
pub mod schema;
pub mod source;

pub use bag_profile::{BagProfile, SerializationPolicy, TagSpec};
pub use payload_profile::{PathRule, PayloadProfile, SeverityOverrides};
pub use source::{FileFetcher, ProfileFetcher, ProfileFormat};
