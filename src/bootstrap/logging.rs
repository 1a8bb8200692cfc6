//! Setup for the application's tracing subscriber.
//!
//! Redirects tracing output to standard output at the level named by the
//! configuration's `log_level` field: `off`, `error`, `warn`, `info`,
//! `debug`, or `trace` (case insensitive). Internal persistence faults are
//! logged at `warn` by the protocol handler, validation failures at
//! `debug`, and server lifecycle events (bind address, driver chosen) at
//! `info`.
use std::sync::Once;

use swarmkeeper_configuration::Configuration;
use tracing::level_filters::LevelFilter;

static INIT: Once = Once::new();

/// Installs the global tracing subscriber, unless `log_level` is `off`.
///
/// Idempotent: only the first call across the process actually installs
/// the subscriber, matching the reference tracker's `Once`-guarded setup.
///
/// # Panics
///
/// Panics if `log_level` is not one of the recognized level names.
pub fn setup(config: &Configuration) {
    let filter = level_filter(&config.log_level);

    if filter == LevelFilter::OFF {
        return;
    }

    INIT.call_once(|| {
        tracing_subscriber::fmt().with_max_level(filter).init();
        tracing::debug!("tracing initialized");
    });
}

fn level_filter(log_level: &str) -> LevelFilter {
    log_level.parse().unwrap_or_else(|_| {
        panic!(
            "Error! Unrecognized `log_level` \"{log_level}\"!\n\n\
             Possible values: off, error, warn, info (default), debug, trace"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_is_recognized_without_panicking() {
        assert_eq!(level_filter("off"), LevelFilter::OFF);
    }

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(level_filter("DEBUG"), LevelFilter::DEBUG);
    }

    #[test]
    #[should_panic(expected = "Unrecognized")]
    fn unknown_level_panics() {
        level_filter("garbage");
    }
}
