//! The shared record types the persistence port stores and the protocol
//! handler reads back: a torrent's metadata and a peer's announced state.
use std::net::SocketAddr;

use swarmkeeper_primitives::{InfoHash, PeerId};

/// A tracker of trackers a `.torrent` announces to, grouped into tiers.
/// Clients try each URL in a tier before falling back to the next tier.
pub type AnnounceList = Vec<Vec<String>>;

/// Everything the tracker knows about one shareable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentRecord {
    pub info_hash: InfoHash,
    pub name: String,
    pub length: u64,
    pub piece_length: u32,
    /// Concatenation of one 20-byte `SHA-1` digest per piece.
    pub pieces: Vec<u8>,
    pub announce_list: AnnounceList,
    pub url_list: Vec<String>,
    pub private: bool,
    pub created_by: Option<String>,
    pub status: TorrentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentStatus {
    Active,
    Inactive,
}

impl TorrentRecord {
    #[must_use]
    pub fn num_pieces(&self) -> u64 {
        self.pieces.len() as u64 / 20
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TorrentStatus::Active
    }
}

/// A peer's announced progress on one torrent, keyed by `(info_hash, peer_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub peer_id: PeerId,
    pub address: SocketAddr,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
    pub bytes_left: u64,
    pub status: PeerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Complete,
    Incomplete,
}

impl PeerRecord {
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.bytes_left == 0
    }
}
