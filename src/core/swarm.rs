//! The logical view a protocol handler reads over the persistence port:
//! rendering whatever live peers the port already returned into the
//! dictionary or compact wire format the client asked for.
//!
//! Liveness filtering and the complete/incomplete counts themselves are the
//! persistence port's job (its queries are already scoped to `now`); this
//! module only shapes the peers the port handed back.
use std::net::IpAddr;

use swarmkeeper_bencode::Value;

use crate::core::models::PeerRecord;

/// Builds the bencoded `peers` value for an announce response, in whichever
/// mode (`compact` or dictionary) the request selected.
#[must_use]
pub fn peer_list(peers: &[PeerRecord], compact: bool, no_peer_id: bool) -> Value {
    if compact {
        Value::bytes(compact_peers(peers))
    } else {
        Value::List(peers.iter().map(|peer| dict_peer(peer, no_peer_id)).collect())
    }
}

fn dict_peer(peer: &PeerRecord, no_peer_id: bool) -> Value {
    let mut dict = Value::dict()
        .entry("ip", Value::string(&peer.address.ip().to_string()))
        .entry("port", Value::Int(i64::from(peer.address.port())));
    if !no_peer_id {
        dict = dict.entry("peer id", Value::bytes(peer.peer_id.0.to_vec()));
    }
    dict.build()
}

/// Packs each IPv4 peer into a 6-byte network-order group (4 bytes of
/// address, 2 bytes of port). IPv6 peers are skipped: no compact-v6
/// extension is negotiated by this tracker.
fn compact_peers(peers: &[PeerRecord]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for peer in peers {
        if let IpAddr::V4(ip) = peer.address.ip() {
            bytes.extend_from_slice(&ip.octets());
            bytes.extend_from_slice(&peer.address.port().to_be_bytes());
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use swarmkeeper_primitives::PeerId;

    use super::*;
    use crate::core::models::PeerStatus;

    fn peer(addr: &str, peer_id: [u8; 20]) -> PeerRecord {
        PeerRecord {
            peer_id: PeerId(peer_id),
            address: addr.parse().unwrap(),
            bytes_uploaded: 0,
            bytes_downloaded: 0,
            bytes_left: 0,
            status: PeerStatus::Incomplete,
        }
    }

    #[test]
    fn compact_mode_packs_one_ipv4_peer_into_six_bytes() {
        let peers = vec![peer("192.0.2.5:6881", [1u8; 20])];
        let value = peer_list(&peers, true, false);
        assert_eq!(value.as_bytes(), Some(&[0xC0, 0x00, 0x02, 0x05, 0x1A, 0xE1][..]));
    }

    #[test]
    fn compact_mode_skips_ipv6_peers() {
        let peers = vec![peer("[::1]:6881", [1u8; 20])];
        let value = peer_list(&peers, true, false);
        assert_eq!(value.as_bytes(), Some(&[][..]));
    }

    #[test]
    fn dictionary_mode_omits_peer_id_when_requested() {
        let peers = vec![peer("192.0.2.5:6881", [9u8; 20])];

        let with_id = peer_list(&peers, false, false);
        let list = with_id.as_list().unwrap();
        assert!(list[0].get("peer id").is_some());

        let without_id = peer_list(&peers, false, true);
        let list = without_id.as_list().unwrap();
        assert!(list[0].get("peer id").is_none());
        assert_eq!(list[0].get("ip").and_then(Value::as_bytes), Some(b"192.0.2.5".as_slice()));
    }
}
