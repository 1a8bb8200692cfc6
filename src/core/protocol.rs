//! The announce/scrape protocol handler: the only part of the core that
//! knows the tracker's wire vocabulary. Both entry points accept a
//! parameter mapping assembled by the HTTP layer and always return a
//! bencoded byte string — success and failure alike — matching the
//! BitTorrent convention of reporting failures inside an HTTP 200 body.
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use swarmkeeper_bencode::Value;
use swarmkeeper_configuration::Configuration;
use swarmkeeper_primitives::{AnnounceEvent, DurationSinceUnixEpoch, InfoHash, PeerId};

use crate::core::databases::Database;
use crate::core::swarm;

/// The parameter mapping the HTTP layer hands the protocol handler: every
/// value is the percent-decoded bytes of its query string entry, since
/// `info_hash`/`peer_id` are not guaranteed to be valid UTF-8.
pub type Params = HashMap<String, Vec<u8>>;

const ANNOUNCE_REQUIRED: [&str; 6] = ["info_hash", "peer_id", "port", "uploaded", "downloaded", "left"];
const SCRAPE_REQUIRED: [&str; 1] = ["info_hash"];

const GENERIC_FAILURE: &str = "Failed to announce/scrape because of internal server error.";

enum ProtocolError {
    Validation(String),
    Internal,
}

impl From<crate::core::databases::Error> for ProtocolError {
    #[track_caller]
    fn from(error: crate::core::databases::Error) -> Self {
        tracing::warn!(%error, "persistence port failure");
        ProtocolError::Internal
    }
}

fn failure_response(reason: &str) -> Vec<u8> {
    let value = Value::dict().entry("failure reason", Value::string(reason)).build();
    swarmkeeper_bencode::encode(&value)
}

fn missing_keys(params: &Params, required: &[&str]) -> Vec<&'static str> {
    required.iter().filter(|key| !params.contains_key(**key)).copied().collect()
}

fn require_keys(params: &Params, required: &[&str]) -> Result<(), ProtocolError> {
    let missing = missing_keys(params, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProtocolError::Validation(format!(
            "Invalid get parameters; Missing: {}",
            missing.join(", ")
        )))
    }
}

fn parse_info_hash(params: &Params) -> Result<InfoHash, ProtocolError> {
    InfoHash::try_from(params["info_hash"].as_slice()).map_err(|_| ProtocolError::Validation("Invalid length of info_hash.".to_string()))
}

fn parse_peer_id(params: &Params) -> Result<PeerId, ProtocolError> {
    PeerId::try_from(params["peer_id"].as_slice()).map_err(|_| ProtocolError::Validation("Invalid length of peer_id.".to_string()))
}

/// Parses a query value as a string of decimal digits with no sign, per the
/// validation pipeline's ban on signed/empty numeric fields.
fn parse_non_negative(params: &Params, key: &str, failure_message: &str) -> Result<u64, ProtocolError> {
    let bytes = &params[key];
    let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::Validation(failure_message.to_string()))?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::Validation(failure_message.to_string()));
    }
    text.parse::<u64>().map_err(|_| ProtocolError::Validation(failure_message.to_string()))
}

fn parse_port(params: &Params) -> Result<u16, ProtocolError> {
    let value = parse_non_negative(params, "port", "Invalid port value.")?;
    u16::try_from(value).map_err(|_| ProtocolError::Validation("Invalid port value.".to_string()))
}

fn parse_event(params: &Params) -> AnnounceEvent {
    params
        .get("event")
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map_or(AnnounceEvent::None, AnnounceEvent::parse)
}

fn parse_flag(params: &Params, key: &str, default: bool) -> bool {
    params
        .get(key)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map_or(default, |value| value == "1")
}

/// Resolves the peer's effective IP: the `ip` query override, else the
/// configured default, else the transport's remote address.
fn resolve_ip(params: &Params, config: &Configuration, remote_addr: SocketAddr) -> Result<IpAddr, ProtocolError> {
    if let Some(raw) = params.get("ip") {
        let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::Validation("Invalid peer ip address.".to_string()))?;
        return text.parse::<IpAddr>().map_err(|_| ProtocolError::Validation("Invalid peer ip address.".to_string()));
    }
    if let Some(default_ip) = &config.default_ip {
        return default_ip
            .parse::<IpAddr>()
            .map_err(|_| ProtocolError::Validation("Invalid peer ip address.".to_string()));
    }
    Ok(remote_addr.ip())
}

/// `stopped` evicts immediately; every other event refreshes for
/// `2 * announce_interval_seconds`.
fn announce_ttl(event: AnnounceEvent, announce_interval_seconds: u32) -> Duration {
    match event {
        AnnounceEvent::Stopped => Duration::from_secs(0),
        _ => Duration::from_secs(u64::from(announce_interval_seconds) * 2),
    }
}

async fn try_announce(
    db: &dyn Database,
    config: &Configuration,
    params: &Params,
    remote_addr: SocketAddr,
    now: DurationSinceUnixEpoch,
) -> Result<Vec<u8>, ProtocolError> {
    require_keys(params, &ANNOUNCE_REQUIRED)?;

    let info_hash = parse_info_hash(params)?;
    let peer_id = parse_peer_id(params)?;
    let port = parse_port(params)?;
    let uploaded = parse_non_negative(params, "uploaded", "Invalid uploaded value.")?;
    let downloaded = parse_non_negative(params, "downloaded", "Invalid downloaded value.")?;
    let left = parse_non_negative(params, "left", "Invalid left value.")?;
    let ip = resolve_ip(params, config, remote_addr)?;

    if !db.has_torrent(&info_hash).await? {
        return Err(ProtocolError::Validation("Torrent not found.".to_string()));
    }

    let event = parse_event(params);
    let compact = parse_flag(params, "compact", config.compact_default);
    let no_peer_id = parse_flag(params, "no_peer_id", false);

    let ttl = announce_ttl(event, config.announce_interval_seconds);
    // A peer is complete once it reports zero bytes left, or once it has
    // sent `completed`, whichever comes first. Any other case leaves the
    // peer's previously stored status untouched (the port coalesces `None`
    // against its existing row, defaulting a never-seen peer to incomplete),
    // which is what keeps a promotion to complete from ever regressing.
    let status =
        (left == 0 || matches!(event, AnnounceEvent::Completed)).then_some(crate::core::models::PeerStatus::Complete);

    db.save_announce(&info_hash, &peer_id, SocketAddr::new(ip, port), uploaded, downloaded, left, status, ttl, now)
        .await?;

    let peers = db.get_peers(&info_hash, &peer_id, now).await?;
    let (complete, incomplete) = db.get_peer_stats(&info_hash, now).await?;

    let response = Value::dict()
        .entry("interval", Value::Int(i64::from(config.announce_interval_seconds)))
        .entry("complete", Value::Int(i64::try_from(complete).unwrap_or(i64::MAX)))
        .entry("incomplete", Value::Int(i64::try_from(incomplete).unwrap_or(i64::MAX)))
        .entry("peers", swarm::peer_list(&peers, compact, no_peer_id))
        .build();

    Ok(swarmkeeper_bencode::encode(&response))
}

/// Validates and serves an announce request, always returning bencoded
/// bytes (a success body or a `failure reason` body).
pub async fn announce(db: &dyn Database, config: &Configuration, params: &Params, remote_addr: SocketAddr, now: DurationSinceUnixEpoch) -> Vec<u8> {
    match try_announce(db, config, params, remote_addr, now).await {
        Ok(bytes) => bytes,
        Err(ProtocolError::Validation(reason)) => failure_response(&reason),
        Err(ProtocolError::Internal) => failure_response(GENERIC_FAILURE),
    }
}

async fn try_scrape(db: &dyn Database, params: &Params, now: DurationSinceUnixEpoch) -> Result<Vec<u8>, ProtocolError> {
    require_keys(params, &SCRAPE_REQUIRED)?;
    let info_hash = parse_info_hash(params)?;

    if !db.has_torrent(&info_hash).await? {
        return Err(ProtocolError::Validation("Torrent not found.".to_string()));
    }

    let (complete, incomplete) = db.get_peer_stats(&info_hash, now).await?;
    let downloaded = db.get_downloads(&info_hash).await?;

    let file_stats = Value::dict()
        .entry("complete", Value::Int(i64::try_from(complete).unwrap_or(i64::MAX)))
        .entry("incomplete", Value::Int(i64::try_from(incomplete).unwrap_or(i64::MAX)))
        .entry("downloaded", Value::Int(i64::try_from(downloaded).unwrap_or(i64::MAX)))
        .build();

    let files = Value::dict().entry_bytes(info_hash.as_bytes().to_vec(), file_stats).build();

    let response = Value::dict().entry("files", files).build();

    Ok(swarmkeeper_bencode::encode(&response))
}

/// Validates and serves a scrape request, always returning bencoded bytes.
pub async fn scrape(db: &dyn Database, params: &Params, now: DurationSinceUnixEpoch) -> Vec<u8> {
    match try_scrape(db, params, now).await {
        Ok(bytes) => bytes,
        Err(ProtocolError::Validation(reason)) => failure_response(&reason),
        Err(ProtocolError::Internal) => failure_response(GENERIC_FAILURE),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::databases::driver;

    fn params(pairs: &[(&str, &[u8])]) -> Params {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.to_vec())).collect()
    }

    fn test_config() -> Configuration {
        Configuration {
            announce_interval_seconds: 60,
            ..Default::default()
        }
    }

    async fn db_with_one_torrent() -> (Arc<dyn Database>, InfoHash) {
        let db: Arc<dyn Database> = driver::build(swarmkeeper_primitives::DatabaseDriver::Sqlite3, ":memory:")
            .unwrap()
            .into();
        let info_hash = InfoHash::from([42u8; 20]);
        db.save_torrent(&crate::core::models::TorrentRecord {
            info_hash,
            name: "x".to_string(),
            length: 10,
            piece_length: 10,
            pieces: vec![0u8; 20],
            announce_list: vec![],
            url_list: vec![],
            private: false,
            created_by: None,
            status: crate::core::models::TorrentStatus::Active,
        })
        .await
        .unwrap();
        (db, info_hash)
    }

    #[tokio::test]
    async fn missing_left_produces_the_spec_error_message() {
        let (db, info_hash) = db_with_one_torrent().await;
        let p = params(&[
            ("info_hash", info_hash.as_bytes()),
            ("peer_id", &[1u8; 20]),
            ("port", b"6881"),
            ("uploaded", b"0"),
            ("downloaded", b"0"),
        ]);
        let config = test_config();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let response = announce(db.as_ref(), &config, &p, addr, Duration::from_secs(0)).await;
        let decoded = swarmkeeper_bencode::decode(&response).unwrap();
        assert_eq!(
            decoded.get("failure reason").and_then(Value::as_bytes),
            Some(b"Invalid get parameters; Missing: left".as_slice())
        );
    }

    #[tokio::test]
    async fn short_info_hash_is_rejected() {
        let (db, _) = db_with_one_torrent().await;
        let p = params(&[
            ("info_hash", &[1u8; 19]),
            ("peer_id", &[1u8; 20]),
            ("port", b"6881"),
            ("uploaded", b"0"),
            ("downloaded", b"0"),
            ("left", b"0"),
        ]);
        let config = test_config();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let response = announce(db.as_ref(), &config, &p, addr, Duration::from_secs(0)).await;
        let decoded = swarmkeeper_bencode::decode(&response).unwrap();
        assert_eq!(
            decoded.get("failure reason").and_then(Value::as_bytes),
            Some(b"Invalid length of info_hash.".as_slice())
        );
    }

    #[tokio::test]
    async fn negative_port_is_rejected() {
        let (db, info_hash) = db_with_one_torrent().await;
        let p = params(&[
            ("info_hash", info_hash.as_bytes()),
            ("peer_id", &[1u8; 20]),
            ("port", b"-1"),
            ("uploaded", b"0"),
            ("downloaded", b"0"),
            ("left", b"0"),
        ]);
        let config = test_config();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let response = announce(db.as_ref(), &config, &p, addr, Duration::from_secs(0)).await;
        let decoded = swarmkeeper_bencode::decode(&response).unwrap();
        assert_eq!(
            decoded.get("failure reason").and_then(Value::as_bytes),
            Some(b"Invalid port value.".as_slice())
        );
    }

    #[tokio::test]
    async fn stopped_peer_is_immediately_excluded_from_peer_lists() {
        let (db, info_hash) = db_with_one_torrent().await;
        let config = test_config();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let now = Duration::from_secs(1_000);

        let peer_a = params(&[
            ("info_hash", info_hash.as_bytes()),
            ("peer_id", &[1u8; 20]),
            ("port", b"6881"),
            ("uploaded", b"0"),
            ("downloaded", b"0"),
            ("left", b"10"),
            ("event", b"started"),
        ]);
        announce(db.as_ref(), &config, &peer_a, addr, now).await;

        let peer_b = params(&[
            ("info_hash", info_hash.as_bytes()),
            ("peer_id", &[2u8; 20]),
            ("port", b"6882"),
            ("uploaded", b"0"),
            ("downloaded", b"0"),
            ("left", b"10"),
            ("event", b"stopped"),
        ]);
        announce(db.as_ref(), &config, &peer_b, addr, now).await;

        let peer_c = params(&[
            ("info_hash", info_hash.as_bytes()),
            ("peer_id", &[3u8; 20]),
            ("port", b"6883"),
            ("uploaded", b"0"),
            ("downloaded", b"0"),
            ("left", b"10"),
        ]);
        let response = announce(db.as_ref(), &config, &peer_c, addr, now).await;
        let decoded = swarmkeeper_bencode::decode(&response).unwrap();
        let peers = decoded.get("peers").and_then(Value::as_list).unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(decoded.get("incomplete").and_then(Value::as_int), Some(1));
    }

    #[tokio::test]
    async fn zero_bytes_left_counts_as_complete_without_a_completed_event() {
        let (db, info_hash) = db_with_one_torrent().await;
        let config = test_config();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let now = Duration::from_secs(1_000);

        let seeder = params(&[
            ("info_hash", info_hash.as_bytes()),
            ("peer_id", &[5u8; 20]),
            ("port", b"6881"),
            ("uploaded", b"0"),
            ("downloaded", b"0"),
            ("left", b"0"),
        ]);
        announce(db.as_ref(), &config, &seeder, addr, now).await;

        let (complete, incomplete) = db.get_peer_stats(&info_hash, now).await.unwrap();
        assert_eq!((complete, incomplete), (1, 0));
    }

    #[tokio::test]
    async fn scrape_reports_unknown_torrent_as_a_failure() {
        let (db, _) = db_with_one_torrent().await;
        let p = params(&[("info_hash", &[9u8; 20])]);
        let response = scrape(db.as_ref(), &p, Duration::from_secs(0)).await;
        let decoded = swarmkeeper_bencode::decode(&response).unwrap();
        assert!(decoded.get("failure reason").is_some());
    }
}
