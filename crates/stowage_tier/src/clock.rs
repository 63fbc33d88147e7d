// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::UNIX_EPOCH;

use tick::Clock;
use tick::runtime::InactiveClock;

/// Creates a clock that follows the system wall clock.
///
/// Engines only read the current time, so the clock is activated without a timer driver.
///
/// # Examples
///
/// ```
/// use stowage_tier::{ClockExt, system_clock};
///
/// assert!(system_clock().epoch_seconds() > 0);
/// ```
#[must_use]
pub fn system_clock() -> Clock {
    let (clock, _driver) = InactiveClock::default().activate();
    clock
}

/// Reads a [`Clock`] in whole seconds since the Unix epoch.
///
/// Engines read the clock when converting a TTL into an absolute expiration and when deciding
/// whether a journal record has expired. Tests drive a clock created from `tick::ClockControl`
/// (re-exported as `ClockControl` with the `test-util` feature).
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use stowage_tier::ClockExt;
/// use tick::Clock;
///
/// let clock = Clock::new_frozen_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
/// assert_eq!(clock.epoch_seconds(), 1_000);
/// ```
pub trait ClockExt: sealed::Sealed {
    /// The current time in whole seconds since the Unix epoch; negative before it.
    fn epoch_seconds(&self) -> i64;
}

impl ClockExt for Clock {
    fn epoch_seconds(&self) -> i64 {
        match self.system_time().duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |secs| -secs),
        }
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for tick::Clock {}
}
