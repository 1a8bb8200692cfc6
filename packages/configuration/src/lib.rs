//! Tracker configuration.
//!
//! The tracker reads a single TOML file at startup. Every field has a
//! sensible default, so an empty file (or a missing one, handled by
//! [`Configuration::load_or_create_default`]) is enough to get a working,
//! public, SQLite-backed tracker on an ephemeral port.
use std::panic::Location;
use std::path::Path;

use serde::{Deserialize, Serialize};
use swarmkeeper_located_error::{Located, LocatedError};
use swarmkeeper_primitives::DatabaseDriver;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        source: LocatedError<'static, std::io::Error>,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        source: LocatedError<'static, toml::de::Error>,
    },
    #[error("failed to serialize default configuration: {source}")]
    Serialize {
        source: LocatedError<'static, toml::ser::Error>,
    },
    #[error("failed to write default configuration file {path}: {source}")]
    Write {
        path: String,
        source: LocatedError<'static, std::io::Error>,
    },
}

/// Top level tracker configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configuration {
    /// Verbosity of the `tracing` subscriber installed at startup.
    pub log_level: String,

    /// Socket address the HTTP tracker binds to.
    pub bind_address: String,

    /// Seconds a client is told to wait between announces.
    pub announce_interval_seconds: u32,

    /// Smallest interval the tracker will accept a client asking for.
    pub min_announce_interval_seconds: u32,

    /// Overrides the effective peer IP when no `ip` query parameter and no
    /// reverse-proxy header apply.
    pub default_ip: Option<String>,

    /// Trust `X-Forwarded-For` over the transport's remote address.
    pub on_reverse_proxy: bool,

    /// Default value for the `compact` announce parameter when the client
    /// omits it.
    pub compact_default: bool,

    /// Which database backend the persistence port should use.
    pub db_driver: DatabaseDriver,

    /// `SQLite` file path, or a `MySQL` connection URL.
    pub db_path: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            bind_address: "0.0.0.0:6969".to_string(),
            announce_interval_seconds: 60,
            min_announce_interval_seconds: 30,
            default_ip: None,
            on_reverse_proxy: false,
            compact_default: false,
            db_driver: DatabaseDriver::Sqlite3,
            db_path: "./storage/tracker/swarmkeeper.db".to_string(),
        }
    }
}

impl Configuration {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the file cannot be read, or
    /// [`Error::Parse`] if it is not valid TOML for this schema.
    #[track_caller]
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.display().to_string(),
            source: Located(e).into(),
        })?;

        toml::from_str(&contents).map_err(|e| Error::Parse {
            path: path.display().to_string(),
            source: Located(e).into(),
        })
    }

    /// Loads configuration from `path`, writing out the default
    /// configuration there first if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Propagates [`Error`] from either the write of the default file or the
    /// subsequent load.
    #[track_caller]
    pub fn load_or_create_default(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            Self::default().write_to_file(path)?;
        }
        Self::load_from_file(path)
    }

    /// Serializes this configuration as TOML and writes it to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] or [`Error::Write`] on failure.
    #[track_caller]
    pub fn write_to_file(&self, path: &Path) -> Result<(), Error> {
        let serialized = toml::to_string_pretty(self).map_err(|e| Error::Serialize { source: Located(e).into() })?;

        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        std::fs::write(path, serialized).map_err(|e| Error::Write {
            path: path.display().to_string(),
            source: Located(e).into(),
        })
    }
}
