//! Error types for ACL filtering
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Configuration errors are fatal at component initialization. Build errors
//! abort a single request's filter construction and must reach the caller;
//! they are never cached and never turned into "no filter".

use crate::types::SegmentKey;
use std::io;
use thiserror::Error;

/// Result type alias for ACL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ACL filtering
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration option is absent
    #[error("Missing required configuration option '{0}'")]
    MissingConfig(&'static str),

    /// A configuration option has an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a posting list failed while building a segment filter
    #[error("Failed to build filter for segment {segment}: {source}")]
    Build {
        /// Segment whose filter could not be built
        segment: SegmentKey,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Segment data failed validation
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// I/O error (segment files, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// True for errors raised while validating configuration
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::MissingConfig(_) | Error::InvalidConfig(_))
    }

    /// True for per-segment filter build failures
    pub fn is_build_error(&self) -> bool {
        matches!(self, Error::Build { .. })
    }
}
