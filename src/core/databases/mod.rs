//! The persistence port: the narrow interface the core depends on to store
//! torrents and peers. Two implementations are provided, [`sqlite::Sqlite`]
//! and [`mysql::Mysql`], selected at startup by [`driver::build`].
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use swarmkeeper_primitives::{DurationSinceUnixEpoch, InfoHash, PeerId};

use crate::core::models::{PeerRecord, PeerStatus, TorrentRecord};

pub mod driver;
pub mod error;
pub mod mysql;
pub mod sqlite;

pub use error::Error;

/// Factory marker used to pick which driver's connection/migration logic
/// `build()` runs; see [`driver::build`] for the dispatch.
pub struct Builder<T> {
    marker: std::marker::PhantomData<T>,
}

/// The store torrents and peers are read from and written to.
///
/// Implementations must persist IP addresses in packed binary form and
/// present them in dotted/colon notation on read, and should recover from a
/// single transient "connection lost" failure by reconnecting and retrying
/// once.
#[async_trait]
pub trait Database: Sync + Send {
    /// Inserts or updates a torrent record, keyed by its info-hash.
    async fn save_torrent(&self, record: &TorrentRecord) -> Result<(), Error>;

    /// Reads back a torrent record by info-hash.
    async fn get_torrent(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, Error>;

    /// Whether an *active* torrent exists for this info-hash.
    async fn has_torrent(&self, info_hash: &InfoHash) -> Result<bool, Error> {
        Ok(matches!(self.get_torrent(info_hash).await?, Some(t) if t.is_active()))
    }

    /// Lists the info-hash and length of every active torrent.
    async fn list_torrents(&self) -> Result<Vec<(InfoHash, u64)>, Error>;

    /// Upserts a peer's announced state, keyed by `(info_hash, peer_id)`.
    /// `status`, when `None`, leaves the peer's previously stored status
    /// untouched (coalesced), which is what keeps a promotion to `complete`
    /// from ever regressing back to `incomplete`.
    #[allow(clippy::too_many_arguments)]
    async fn save_announce(
        &self,
        info_hash: &InfoHash,
        peer_id: &PeerId,
        address: SocketAddr,
        uploaded: u64,
        downloaded: u64,
        left: u64,
        status: Option<PeerStatus>,
        ttl: Duration,
        now: DurationSinceUnixEpoch,
    ) -> Result<(), Error>;

    /// Live peers for a torrent, excluding `exclude_peer_id`.
    async fn get_peers(
        &self,
        info_hash: &InfoHash,
        exclude_peer_id: &PeerId,
        now: DurationSinceUnixEpoch,
    ) -> Result<Vec<PeerRecord>, Error>;

    /// `(complete, incomplete)` counts over live peers.
    async fn get_peer_stats(&self, info_hash: &InfoHash, now: DurationSinceUnixEpoch) -> Result<(u64, u64), Error>;

    /// Lifetime count of peers ever marked complete for this torrent, not
    /// filtered by expiry (see the Open Question decision in `DESIGN.md`).
    async fn get_downloads(&self, info_hash: &InfoHash) -> Result<u64, Error>;

    /// Drops and re-establishes any per-process connection. Only needed in
    /// pre-fork deployments; implementations on runtimes without fork may
    /// leave this a no-op.
    async fn reset_after_fork(&self) -> Result<(), Error> {
        Ok(())
    }
}
