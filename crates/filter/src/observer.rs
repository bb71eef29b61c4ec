//! Build measurements sink
//!
//! Every filter build reports its duration and size to the sink injected
//! into the builder.

use std::time::Duration;

#[cfg(any(test, feature = "test-util"))]
use parking_lot::Mutex;
use strata_acl_core::SegmentKey;
use tracing::{debug, warn};

/// One completed segment filter build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEvent {
    /// Segment the bitmap was built for
    pub segment: SegmentKey,
    /// Bitmap size in bits
    pub max_doc: u32,
    /// Distinct principals looked up
    pub principals: usize,
    /// Ordinals set in the result
    pub matched: usize,
    /// Wall time spent building
    pub elapsed: Duration,
}

/// One failed segment filter build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    /// Segment whose build failed
    pub segment: SegmentKey,
    /// Rendered I/O error
    pub error: String,
    /// Wall time spent before failing
    pub elapsed: Duration,
}

/// Receives filter build measurements.
pub trait BuildObserver: Send + Sync {
    /// Called after every successful build
    fn on_build(&self, event: &BuildEvent);

    /// Called when a build aborts
    fn on_failure(&self, _failure: &BuildFailure) {}
}

/// Default sink: structured `tracing` events under `strata::acl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn on_build(&self, event: &BuildEvent) {
        debug!(
            target: "strata::acl",
            segment = %event.segment,
            max_doc = event.max_doc,
            principals = event.principals,
            matched = event.matched,
            elapsed_us = event.elapsed.as_micros() as u64,
            "Built segment filter"
        );
    }

    fn on_failure(&self, failure: &BuildFailure) {
        warn!(
            target: "strata::acl",
            segment = %failure.segment,
            error = %failure.error,
            elapsed_us = failure.elapsed.as_micros() as u64,
            "Segment filter build failed"
        );
    }
}

/// Sink that keeps every event in memory, for tests.
///
/// Nothing is ever dropped, so it is only built with the `test-util`
/// feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingObserver {
    builds: Mutex<Vec<BuildEvent>>,
    failures: Mutex<Vec<BuildFailure>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful builds so far, in arrival order
    pub fn builds(&self) -> Vec<BuildEvent> {
        self.builds.lock().clone()
    }

    /// Failed builds so far, in arrival order
    pub fn failures(&self) -> Vec<BuildFailure> {
        self.failures.lock().clone()
    }

    /// Number of successful builds
    pub fn build_count(&self) -> usize {
        self.builds.lock().len()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl BuildObserver for RecordingObserver {
    fn on_build(&self, event: &BuildEvent) {
        self.builds.lock().push(event.clone());
    }

    fn on_failure(&self, failure: &BuildFailure) {
        self.failures.lock().push(failure.clone());
    }
}
