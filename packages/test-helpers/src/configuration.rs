//! Tracker configuration factories for testing.
use std::env;

use swarmkeeper_configuration::Configuration;

use crate::random;

/// This configuration is used for testing. It generates random storage
/// paths and binds to an ephemeral port, so tests do not collide when run
/// concurrently.
///
/// > **NOTICE**: port 0 is used for the bind address, which means the OS
/// will assign a random free port.
///
/// # Panics
///
/// Will panic if it can't convert the temp file path to a string.
#[must_use]
pub fn ephemeral() -> Configuration {
    let mut config = Configuration {
        log_level: "off".to_string(), // change to "debug" for tests debugging
        bind_address: "127.0.0.1:0".to_string(),
        ..Configuration::default()
    };

    let temp_directory = env::temp_dir();
    let random_db_id = random::string(16);
    let temp_file = temp_directory.join(format!("swarmkeeper_test_{random_db_id}.db"));
    config.db_path = temp_file.to_str().unwrap().to_string();

    config
}

/// Ephemeral configuration with the reverse-proxy `X-Forwarded-For` lookup
/// enabled.
#[must_use]
pub fn ephemeral_with_reverse_proxy() -> Configuration {
    let mut cfg = ephemeral();
    cfg.on_reverse_proxy = true;
    cfg
}

/// Ephemeral configuration without reverse-proxy support (trusts the
/// transport's own remote address).
#[must_use]
pub fn ephemeral_without_reverse_proxy() -> Configuration {
    let mut cfg = ephemeral();
    cfg.on_reverse_proxy = false;
    cfg
}

/// Ephemeral configuration defaulting announces to compact peer-list mode.
#[must_use]
pub fn ephemeral_with_compact_default() -> Configuration {
    let mut cfg = ephemeral();
    cfg.compact_default = true;
    cfg
}
