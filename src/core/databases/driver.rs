//! Selects and constructs the configured persistence backend.
use swarmkeeper_primitives::DatabaseDriver;

use super::{mysql::Mysql, sqlite::Sqlite, Builder, Database, Error};

/// Builds the [`Database`] implementation matching the configured driver.
///
/// # Errors
///
/// Propagates whatever [`Error`] the chosen driver's connection/migration
/// step returns.
pub fn build(driver: DatabaseDriver, db_path: &str) -> Result<Box<dyn Database>, Error> {
    match driver {
        DatabaseDriver::Sqlite3 => Builder::<Sqlite>::build(db_path),
        DatabaseDriver::MySQL => Builder::<Mysql>::build(db_path),
    }
}

#[cfg(test)]
mod tests {
    use swarmkeeper_primitives::DatabaseDriver;

    use super::build;

    #[test]
    fn builds_an_in_memory_sqlite_database() {
        let db = build(DatabaseDriver::Sqlite3, ":memory:");
        assert!(db.is_ok());
    }
}
