// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Timing helpers for telemetry recording.

use std::time::{Duration, Instant};

/// Result of a timed operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedResult<R> {
    /// The result of the operation.
    pub result: R,
    /// The duration of the operation.
    pub duration: Duration,
}

/// Runs `f` and returns its result with the elapsed time.
pub(crate) fn timed<R>(f: impl FnOnce() -> R) -> TimedResult<R> {
    let start = Instant::now();
    let result = f();
    TimedResult {
        result,
        duration: start.elapsed(),
    }
}
