//! Primitive types shared by the `swarmkeeper` tracker packages.
//!
//! These are the small value types that cross crate boundaries: the
//! info-hash and peer-id byte identifiers, the announce event enum, the
//! database driver selector, and the Unix-epoch duration type clocks and
//! peer records use for timestamps.

pub mod announce_event;
pub mod info_hash;
pub mod peer_id;

pub use announce_event::AnnounceEvent;
pub use info_hash::InfoHash;
pub use peer_id::PeerId;

/// A point in time expressed as a duration since the Unix epoch.
///
/// Using `Duration` rather than `SystemTime` keeps peer TTL arithmetic
/// (`now + ttl`, `expires > now`) simple and keeps clock implementations
/// interchangeable between production and test doubles.
pub type DurationSinceUnixEpoch = std::time::Duration;

/// The database management system backing the persistence port.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, derive_more::Display, Clone, Copy)]
pub enum DatabaseDriver {
    /// The `SQLite` database driver.
    Sqlite3,
    /// The `MySQL` database driver.
    MySQL,
}
