//! The `SQLite3` database driver.
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;
use swarmkeeper_primitives::{DatabaseDriver, DurationSinceUnixEpoch, InfoHash, PeerId};

use super::{Builder, Database, Error};
use crate::core::models::{PeerRecord, PeerStatus, TorrentRecord, TorrentStatus};

const DRIVER: DatabaseDriver = DatabaseDriver::Sqlite3;

pub struct Sqlite {
    pool: Pool<SqliteConnectionManager>,
}

impl Builder<Sqlite> {
    /// Opens (creating if needed) the `SQLite3` database at `db_path` and
    /// ensures the `torrents`/`peers` tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionPool`] if the connection pool cannot be
    /// built, or [`Error::InvalidQuery`] if table creation fails.
    pub fn build(db_path: &str) -> Result<Box<dyn Database>, Error> {
        let cm = SqliteConnectionManager::file(db_path);
        let pool = Pool::new(cm).map_err(|e| (e, DRIVER))?;
        let sqlite = Sqlite { pool };
        sqlite.create_database_tables()?;
        Ok(Box::new(sqlite))
    }
}

impl Sqlite {
    fn create_database_tables(&self) -> Result<(), Error> {
        let create_torrents_table = "
        CREATE TABLE IF NOT EXISTS torrents (
            info_hash TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            length INTEGER NOT NULL,
            piece_length INTEGER NOT NULL,
            pieces BLOB NOT NULL,
            announce_list TEXT NOT NULL,
            url_list TEXT NOT NULL,
            private INTEGER NOT NULL,
            created_by TEXT,
            status TEXT NOT NULL
        );";

        let create_peers_table = "
        CREATE TABLE IF NOT EXISTS peers (
            info_hash TEXT NOT NULL,
            peer_id TEXT NOT NULL,
            address BLOB NOT NULL,
            port INTEGER NOT NULL,
            uploaded INTEGER NOT NULL,
            downloaded INTEGER NOT NULL,
            bytes_left INTEGER NOT NULL,
            status TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            ttl INTEGER NOT NULL,
            PRIMARY KEY (info_hash, peer_id)
        );";

        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        conn.execute(create_torrents_table, [])?;
        conn.execute(create_peers_table, [])?;

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
impl Database for Sqlite {
    async fn save_torrent(&self, record: &TorrentRecord) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let announce_list = serde_json::to_string(&record.announce_list).unwrap_or_default();
        let url_list = serde_json::to_string(&record.url_list).unwrap_or_default();

        let affected = conn.execute(
            "INSERT INTO torrents (info_hash, name, length, piece_length, pieces, announce_list, url_list, private, created_by, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(info_hash) DO UPDATE SET
                name = ?2, length = ?3, piece_length = ?4, pieces = ?5,
                announce_list = ?6, url_list = ?7, private = ?8, created_by = ?9, status = ?10",
            params![
                record.info_hash.to_string(),
                record.name,
                i64::try_from(record.length).unwrap_or(i64::MAX),
                record.piece_length,
                record.pieces,
                announce_list,
                url_list,
                i64::from(record.private),
                record.created_by,
                status_to_str(record.status),
            ],
        )?;

        if affected == 0 {
            Err(Error::InsertFailed {
                location: Location::caller(),
                driver: DRIVER,
            })
        } else {
            Ok(())
        }
    }

    async fn get_torrent(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare(
            "SELECT info_hash, name, length, piece_length, pieces, announce_list, url_list, private, created_by, status
             FROM torrents WHERE info_hash = ?1",
        )?;

        let mut rows = stmt.query([info_hash.to_string()])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let announce_list: String = row.get(5)?;
        let url_list: String = row.get(6)?;
        let private: i64 = row.get(7)?;
        let length: i64 = row.get(2)?;

        Ok(Some(TorrentRecord {
            info_hash: *info_hash,
            name: row.get(1)?,
            length: u64::try_from(length).unwrap_or(0),
            piece_length: row.get(3)?,
            pieces: row.get(4)?,
            announce_list: serde_json::from_str(&announce_list).unwrap_or_default(),
            url_list: serde_json::from_str(&url_list).unwrap_or_default(),
            private: private != 0,
            created_by: row.get(8)?,
            status: status_from_str(&row.get::<_, String>(9)?),
        }))
    }

    async fn list_torrents(&self) -> Result<Vec<(InfoHash, u64)>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT info_hash, length FROM torrents WHERE status = 'active'")?;

        let rows = stmt.query_map([], |row| {
            let info_hash: String = row.get(0)?;
            let length: i64 = row.get(1)?;
            Ok((info_hash, length))
        })?;

        let mut torrents = Vec::new();
        for row in rows {
            let (info_hash, length) = row?;
            if let Ok(info_hash) = InfoHash::from_str(&info_hash) {
                torrents.push((info_hash, u64::try_from(length).unwrap_or(0)));
            }
        }
        Ok(torrents)
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
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let status = match status {
            Some(status) => peer_status_to_str(status).to_string(),
            None => {
                let mut stmt =
                    conn.prepare("SELECT status FROM peers WHERE info_hash = ?1 AND peer_id = ?2")?;
                let mut rows = stmt.query([info_hash.to_string(), peer_id.to_string()])?;
                match rows.next()? {
                    Some(row) => row.get::<_, String>(0)?,
                    None => peer_status_to_str(PeerStatus::Incomplete).to_string(),
                }
            }
        };

        conn.execute(
            "INSERT INTO peers (info_hash, peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(info_hash, peer_id) DO UPDATE SET
                address = ?3, port = ?4, uploaded = ?5, downloaded = ?6, bytes_left = ?7, status = ?8, updated_at = ?9, ttl = ?10",
            params![
                info_hash.to_string(),
                peer_id.to_string(),
                pack_ip(address.ip()),
                i64::from(address.port()),
                i64::try_from(uploaded).unwrap_or(i64::MAX),
                i64::try_from(downloaded).unwrap_or(i64::MAX),
                i64::try_from(left).unwrap_or(i64::MAX),
                status,
                i64::try_from(now.as_secs()).unwrap_or(i64::MAX),
                i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            ],
        )?;

        Ok(())
    }

    async fn get_peers(
        &self,
        info_hash: &InfoHash,
        exclude_peer_id: &PeerId,
        now: DurationSinceUnixEpoch,
    ) -> Result<Vec<PeerRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare(
            "SELECT peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl
             FROM peers WHERE info_hash = ?1 AND peer_id != ?2",
        )?;

        let rows = stmt.query_map([info_hash.to_string(), exclude_peer_id.to_string()], |row| {
            let peer_id: String = row.get(0)?;
            let address: Vec<u8> = row.get(1)?;
            let port: i64 = row.get(2)?;
            let uploaded: i64 = row.get(3)?;
            let downloaded: i64 = row.get(4)?;
            let bytes_left: i64 = row.get(5)?;
            let status: String = row.get(6)?;
            let updated_at: i64 = row.get(7)?;
            let ttl: i64 = row.get(8)?;
            Ok((peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl))
        })?;

        let mut peers = Vec::new();
        for row in rows {
            let (peer_id, address, port, uploaded, downloaded, bytes_left, status, updated_at, ttl) = row?;
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
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt =
            conn.prepare("SELECT status, updated_at, ttl FROM peers WHERE info_hash = ?1")?;

        let rows = stmt.query_map([info_hash.to_string()], |row| {
            let status: String = row.get(0)?;
            let updated_at: i64 = row.get(1)?;
            let ttl: i64 = row.get(2)?;
            Ok((status, updated_at, ttl))
        })?;

        let mut complete = 0u64;
        let mut incomplete = 0u64;
        for row in rows {
            let (status, updated_at, ttl) = row?;
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
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM peers WHERE info_hash = ?1 AND status = 'complete'",
            [info_hash.to_string()],
            |row| row.get(0),
        )?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
