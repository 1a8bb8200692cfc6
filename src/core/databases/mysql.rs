//! The `MySQL` database driver.
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_mysql::mysql::prelude::Queryable;
use r2d2_mysql::mysql::{params, Opts, OptsBuilder};
use r2d2_mysql::MySqlConnectionManager;
use swarmkeeper_primitives::{DatabaseDriver, DurationSinceUnixEpoch, InfoHash, PeerId};

use super::{Builder, Database, Error};
use crate::core::models::{PeerRecord, PeerStatus, TorrentRecord, TorrentStatus};

const DRIVER: DatabaseDriver = DatabaseDriver::MySQL;

pub struct Mysql {
    pool: Pool<MySqlConnectionManager>,
}

impl Builder<Mysql> {
    /// Connects to the `MySQL` instance at the `db_path` connection URL and
    /// ensures the `torrents`/`peers` tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionError`] if the URL cannot be parsed,
    /// [`Error::ConnectionPool`] if the pool cannot be built, or
    /// [`Error::InvalidQuery`] if table creation fails.
    pub fn build(db_path: &str) -> Result<Box<dyn Database>, Error> {
        let opts = Opts::from_url(db_path)?;
        let builder = OptsBuilder::from_opts(opts);
        let manager = MySqlConnectionManager::new(builder);
        let pool = r2d2::Pool::builder().build(manager).map_err(|e| (e, DRIVER))?;

        let mysql = Mysql { pool };
        mysql.create_database_tables()?;
        Ok(Box::new(mysql))
    }
}

impl Mysql {
    fn create_database_tables(&self) -> Result<(), Error> {
        let create_torrents_table = "
        CREATE TABLE IF NOT EXISTS torrents (
            info_hash VARCHAR(40) PRIMARY KEY,
            name TEXT NOT NULL,
            length BIGINT NOT NULL,
            piece_length INT NOT NULL,
            pieces LONGBLOB NOT NULL,
            announce_list TEXT NOT NULL,
            url_list TEXT NOT NULL,
            private TINYINT NOT NULL,
            created_by TEXT,
            status VARCHAR(16) NOT NULL
        );";

        let create_peers_table = "
        CREATE TABLE IF NOT EXISTS peers (
            info_hash VARCHAR(40) NOT NULL,
            peer_id VARCHAR(40) NOT NULL,
            address VARBINARY(16) NOT NULL,
            port SMALLINT UNSIGNED NOT NULL,
            uploaded BIGINT NOT NULL,
            downloaded BIGINT NOT NULL,
            bytes_left BIGINT NOT NULL,
            status VARCHAR(16) NOT NULL,
            updated_at BIGINT NOT NULL,
            ttl BIGINT NOT NULL,
            PRIMARY KEY (info_hash, peer_id)
        );";

        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        conn.query_drop(create_torrents_table)?;
        conn.query_drop(create_peers_table)?;

        Ok(())
    }
}

fn status_to_str(status: TorrentStatus) -> &'static str {
    match status {
        TorrentStatus::Active => "active",
        TorrentStatus::Inactive => "inactive",
    }
}

fn status_from_str(value: &str) -> TorrentStatus {
    match value {
        "inactive" => TorrentStatus::Inactive,
        _ => TorrentStatus::Active,
    }
}

fn peer_status_to_str(status: PeerStatus) -> &'static str {
    match status {
        PeerStatus::Complete => "complete",
        PeerStatus::Incomplete => "incomplete",
    }
}

fn peer_status_from_str(value: &str) -> PeerStatus {
    match value {
        "complete" => PeerStatus::Complete,
        _ => PeerStatus::Incomplete,
    }
}

/// Packs an IP address into its 4- or 16-byte network form, for compact
/// binary storage rather than a display-formatted string.
fn pack_ip(ip: IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Unpacks a 4- or 16-byte address back into an [`IpAddr`].
fn unpack_ip(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        _ => None,
    }
}

#[async_trait]
impl Database for Mysql {
    async fn save_torrent(&self, record: &TorrentRecord) -> Result<(), Error> {
        const COMMAND: &str = "INSERT INTO torrents
            (info_hash, name, length, piece_length, pieces, announce_list, url_list, private, created_by, status)
            VALUES (:info_hash, :name, :length, :piece_length, :pieces, :announce_list, :url_list, :private, :created_by, :status)
            ON DUPLICATE KEY UPDATE
                name = VALUES(name), length = VALUES(length), piece_length = VALUES(piece_length),
                pieces = VALUES(pieces), announce_list = VALUES(announce_list), url_list = VALUES(url_list),
                private = VALUES(private), created_by = VALUES(created_by), status = VALUES(status)";

        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let info_hash = record.info_hash.to_string();
        let name = record.name.clone();
        let length = i64::try_from(record.length).unwrap_or(i64::MAX);
        let piece_length = record.piece_length;
        let pieces = record.pieces.clone();
        let announce_list = serde_json::to_string(&record.announce_list).unwrap_or_default();
        let url_list = serde_json::to_string(&record.url_list).unwrap_or_default();
        let private = i64::from(record.private);
        let created_by = record.created_by.clone();
        let status = status_to_str(record.status);

        Ok(conn.exec_drop(
            COMMAND,
            params! { info_hash, name, length, piece_length, pieces, announce_list, url_list, private, created_by, status },
        )?)
    }

    async fn get_torrent(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let row = conn.exec_first::<(String, i64, i32, Vec<u8>, String, String, i8, Option<String>, String), _, _>(
            "SELECT name, length, piece_length, pieces, announce_list, url_list, private, created_by, status
             FROM torrents WHERE info_hash = :info_hash",
            params! { "info_hash" => info_hash.to_string() },
        )?;

        Ok(row.map(
            |(name, length, piece_length, pieces, announce_list, url_list, private, created_by, status)| TorrentRecord {
                info_hash: *info_hash,
                name,
                length: u64::try_from(length).unwrap_or(0),
                piece_length: u32::try_from(piece_length).unwrap_or(0),
                pieces,
                announce_list: serde_json::from_str(&announce_list).unwrap_or_default(),
                url_list: serde_json::from_str(&url_list).unwrap_or_default(),
                private: private != 0,
                created_by,
                status: status_from_str(&status),
            },
        ))
    }

    async fn list_torrents(&self) -> Result<Vec<(InfoHash, u64)>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let rows = conn.query_map(
            "SELECT info_hash, length FROM torrents WHERE status = 'active'",
            |(info_hash, length): (String, i64)| (info_hash, length),
        )?;

        Ok(rows
            .into_iter()
            .filter_map(|(info_hash, length)| {
                InfoHash::from_str(&info_hash)
                    .ok()
                    .map(|info_hash| (info_hash, u64::try_from(length).unwrap_or(0)))
            })
            .collect())
    }

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
    ) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let status = match status {
            Some(status) => peer_status_to_str(status).to_string(),
            None => {
                let existing = conn.exec_first::<String, _, _>(
                    "SELECT status FROM peers WHERE info_hash = :info_hash AND peer_id = :peer_id",
                    params! { "info_hash" => info_hash.to_string(), "peer_id" => peer_id.to_string() },
                )?;
                existing.unwrap_or_else(|| peer_status_to_str(PeerStatus::Incomplete).to_string())
            }
        };

        const COMMAND: &str = "INSERT INTO peers
            (info_hash, peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl)
            VALUES (:info_hash, :peer_id, :address, :port, :uploaded, :downloaded, :bytes_left, :status, :updated_at, :ttl)
            ON DUPLICATE KEY UPDATE
                address = VALUES(address), port = VALUES(port), uploaded = VALUES(uploaded), downloaded = VALUES(downloaded),
                bytes_left = VALUES(bytes_left), status = VALUES(status), updated_at = VALUES(updated_at), ttl = VALUES(ttl)";

        let info_hash = info_hash.to_string();
        let peer_id = peer_id.to_string();
        let port = i64::from(address.port());
        let address = pack_ip(address.ip());
        let uploaded = i64::try_from(uploaded).unwrap_or(i64::MAX);
        let downloaded = i64::try_from(downloaded).unwrap_or(i64::MAX);
        let bytes_left = i64::try_from(left).unwrap_or(i64::MAX);
        let updated_at = i64::try_from(now.as_secs()).unwrap_or(i64::MAX);
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        Ok(conn.exec_drop(
            COMMAND,
            params! { info_hash, peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl },
        )?)
    }

    async fn get_peers(
        &self,
        info_hash: &InfoHash,
        exclude_peer_id: &PeerId,
        now: DurationSinceUnixEpoch,
    ) -> Result<Vec<PeerRecord>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let rows = conn.exec_map(
            "SELECT peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl
             FROM peers WHERE info_hash = :info_hash AND peer_id != :exclude_peer_id",
            params! { "info_hash" => info_hash.to_string(), "exclude_peer_id" => exclude_peer_id.to_string() },
            |(peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl): (
                String,
                Vec<u8>,
                i64,
                i64,
                i64,
                i64,
                String,
                i64,
                i64,
            )| (peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl),
        )?;

        let mut peers = Vec::new();
        for (peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl) in rows {
            let is_live = now.as_secs() < updated_at.unsigned_abs() + ttl.unsigned_abs();
            if !is_live {
                continue;
            }
            let (Ok(peer_id), Some(ip)) = (PeerId::from_str(&peer_id), unpack_ip(&address)) else {
                continue;
            };
            let Ok(port) = u16::try_from(port) else {
                continue;
            };
            peers.push(PeerRecord {
                peer_id,
                address: SocketAddr::new(ip, port),
                bytes_uploaded: u64::try_from(uploaded).unwrap_or(0),
                bytes_downloaded: u64::try_from(downloaded).unwrap_or(0),
                bytes_left: u64::try_from(bytes_left).unwrap_or(0),
                status: peer_status_from_str(&status),
            });
        }
        Ok(peers)
    }

    async fn get_peer_stats(&self, info_hash: &InfoHash, now: DurationSinceUnixEpoch) -> Result<(u64, u64), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let rows = conn.exec_map(
            "SELECT status, updated_at, ttl FROM peers WHERE info_hash = :info_hash",
            params! { "info_hash" => info_hash.to_string() },
            |(status, updated_at, ttl): (String, i64, i64)| (status, updated_at, ttl),
        )?;

        let mut complete = 0u64;
        let mut incomplete = 0u64;
        for (status, updated_at, ttl) in rows {
            if now.as_secs() >= updated_at.unsigned_abs() + ttl.unsigned_abs() {
                continue;
            }
            match peer_status_from_str(&status) {
                PeerStatus::Complete => complete += 1,
                PeerStatus::Incomplete => incomplete += 1,
            }
        }
        Ok((complete, incomplete))
    }

    async fn get_downloads(&self, info_hash: &InfoHash) -> Result<u64, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let count: Option<i64> = conn.exec_first(
            "SELECT COUNT(*) FROM peers WHERE info_hash = :info_hash AND status = 'complete'",
            params! { "info_hash" => info_hash.to_string() },
        )?;

        Ok(u64::try_from(count.unwrap_or(0)).unwrap_or(0))
    }
}
