//! Checks evaluate declarative expectations against resources fetched from
//! the cloud provider.
//!
//! Right now the following checks are implemented:
//! - properties: existence, field values and tag entries of a single
//!   resource.

pub mod properties;
