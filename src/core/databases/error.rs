//! Persistence port errors.
use std::panic::Location;
use std::sync::Arc;

use r2d2_mysql::mysql::UrlError;
use swarmkeeper_located_error::{DynError, Located, LocatedError};
use swarmkeeper_primitives::DatabaseDriver;

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("the {driver} query unexpectedly returned nothing: {source}")]
    QueryReturnedNoRows {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
        driver: DatabaseDriver,
    },

    #[error("the {driver} query was malformed: {source}")]
    InvalidQuery {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
        driver: DatabaseDriver,
    },

    #[error("unable to insert record into {driver} database, {location}")]
    InsertFailed {
        location: &'static Location<'static>,
        driver: DatabaseDriver,
    },

    #[error("failed to connect to {driver} database: {source}")]
    ConnectionError {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
        driver: DatabaseDriver,
    },

    #[error("failed to create r2d2 {driver} connection pool: {source}")]
    ConnectionPool {
        source: LocatedError<'static, r2d2::Error>,
        driver: DatabaseDriver,
    },
}

impl From<(r2d2::Error, DatabaseDriver)> for Error {
    #[track_caller]
    fn from(e: (r2d2::Error, DatabaseDriver)) -> Self {
        let (err, driver) = e;
        Self::ConnectionPool {
            source: Located(err).into(),
            driver,
        }
    }
}

impl From<r2d2_sqlite::rusqlite::Error> for Error {
    #[track_caller]
    fn from(err: r2d2_sqlite::rusqlite::Error) -> Self {
        match err {
            r2d2_sqlite::rusqlite::Error::QueryReturnedNoRows => Self::QueryReturnedNoRows {
                source: (Arc::new(err) as DynError).into(),
                driver: DatabaseDriver::Sqlite3,
            },
            _ => Self::InvalidQuery {
                source: (Arc::new(err) as DynError).into(),
                driver: DatabaseDriver::Sqlite3,
            },
        }
    }
}

impl From<r2d2_mysql::mysql::Error> for Error {
    #[track_caller]
    fn from(err: r2d2_mysql::mysql::Error) -> Self {
        let e: DynError = Arc::new(err);
        Self::InvalidQuery {
            source: e.into(),
            driver: DatabaseDriver::MySQL,
        }
    }
}

impl From<UrlError> for Error {
    #[track_caller]
    fn from(err: UrlError) -> Self {
        Self::ConnectionError {
            source: Located(err).into(),
            driver: DatabaseDriver::MySQL,
        }
    }
}
