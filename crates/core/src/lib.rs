//! Core types for Strata ACL filtering
//!
//! This crate defines the foundational types shared by the index and filter crates:
//! - DocOrdinal / SegmentKey: document and segment snapshot identity
//! - PrincipalSet / PrincipalKey: requesting principals and their canonical cache key
//! - Error: error taxonomy (configuration, build, corruption)
//! - AclConfig / FilterSettings: component configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod principal;
pub mod types;

pub use config::{AclConfig, FilterSettings, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use principal::{PrincipalKey, PrincipalSet};
pub use types::{DocOrdinal, SegmentKey};
