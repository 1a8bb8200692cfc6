//! Time related functions and types.
//!
//! It's usually a good idea to control where the time comes from in an
//! application so that it can be mocked for testing and controlled in
//! production without relying on the underlying system's time zone.
//!
//! Clocks use the [`DurationSinceUnixEpoch`](swarmkeeper_primitives::DurationSinceUnixEpoch)
//! type, a [`std::time::Duration`] since the Unix Epoch.

pub mod clock;

/// Working version, for production.
#[cfg(not(test))]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Stopped;
