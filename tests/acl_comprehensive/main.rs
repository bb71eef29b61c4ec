//! ACL Comprehensive Test Suite
//!
//! End-to-end coverage of principal-set filtering: filter construction
//! against real segments, the filter cache and its statistics, the request
//! pipeline stage, concurrency, and segment files on disk.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test acl_comprehensive
//!
//! # Run property tests only
//! cargo test --test acl_comprehensive properties::
//!
//! # Run with log output
//! cargo test --test acl_comprehensive -- --nocapture
//! ```

mod common;

mod concurrency;
mod scenarios;
