//! The peer-id: a 20-byte opaque identifier a client chooses for itself.
use std::panic::Location;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
#[error("Peer id must be exactly 20 bytes, got {input_bytes}, {location}")]
pub struct ConversionError {
    location: &'static Location<'static>,
    input_bytes: usize,
}

/// Number of bytes in a peer-id.
pub const PEER_ID_BYTES_LEN: usize = 20;

/// A 20-byte `BitTorrent` peer-id. Unlike the info-hash, peers are free to
/// choose any byte sequence (most clients embed an ASCII client tag), so this
/// type renders as a hex string rather than assuming UTF-8.
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PeerId(#[serde(with = "hex::serde")] pub [u8; PEER_ID_BYTES_LEN]);

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerId({self})")
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl TryFrom<&[u8]> for PeerId {
    type Error = ConversionError;

    #[track_caller]
    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        if data.len() != PEER_ID_BYTES_LEN {
            return Err(ConversionError {
                location: Location::caller(),
                input_bytes: data.len(),
            });
        }
        let mut bytes = [0u8; PEER_ID_BYTES_LEN];
        bytes.clone_from_slice(data);
        Ok(PeerId(bytes))
    }
}

impl From<[u8; PEER_ID_BYTES_LEN]> for PeerId {
    fn from(bytes: [u8; PEER_ID_BYTES_LEN]) -> Self {
        PeerId(bytes)
    }
}

impl FromStr for PeerId {
    type Err = ConversionError;

    #[track_caller]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ConversionError {
            location: Location::caller(),
            input_bytes: s.len(),
        })?;
        PeerId::try_from(bytes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::PeerId;

    #[test]
    fn should_reject_wrong_length() {
        assert!(PeerId::try_from(&[0u8; 19][..]).is_err());
        assert!(PeerId::try_from(&[0u8; 21][..]).is_err());
    }

    #[test]
    fn should_accept_twenty_bytes() {
        assert!(PeerId::try_from(&[0u8; 20][..]).is_ok());
    }

    #[test]
    fn round_trips_through_its_hex_display() {
        let id = PeerId::from([7u8; 20]);
        assert_eq!(PeerId::from_str(&id.to_string()).unwrap(), id);
    }
}
