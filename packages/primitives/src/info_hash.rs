//! The info-hash: the 20-byte `SHA-1` digest that identifies a torrent.
use std::panic::Location;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of bytes in an info-hash (`SHA-1` digest length).
pub const INFO_HASH_BYTES_LEN: usize = 20;

#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("Not enough bytes for info-hash: {input_bytes} expected {INFO_HASH_BYTES_LEN}, {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        input_bytes: usize,
    },
    #[error("Too many bytes for info-hash: {input_bytes} expected {INFO_HASH_BYTES_LEN}, {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        input_bytes: usize,
    },
    #[error("Invalid hex string for info-hash: {source}, {location}")]
    InvalidHex {
        location: &'static Location<'static>,
        source: hex::FromHexError,
    },
}

/// A 20-byte `BitTorrent` info-hash.
#[derive(Default, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; INFO_HASH_BYTES_LEN]);

impl InfoHash {
    #[must_use]
    pub fn bytes(&self) -> [u8; INFO_HASH_BYTES_LEN] {
        self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InfoHash({self})")
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::ops::Deref for InfoHash {
    type Target = [u8; INFO_HASH_BYTES_LEN];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; INFO_HASH_BYTES_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_BYTES_LEN]) -> Self {
        InfoHash(bytes)
    }
}

impl TryFrom<&[u8]> for InfoHash {
    type Error = ConversionError;

    #[track_caller]
    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        if data.len() < INFO_HASH_BYTES_LEN {
            return Err(ConversionError::NotEnoughBytes {
                location: Location::caller(),
                input_bytes: data.len(),
            });
        }
        if data.len() > INFO_HASH_BYTES_LEN {
            return Err(ConversionError::TooManyBytes {
                location: Location::caller(),
                input_bytes: data.len(),
            });
        }
        let mut ret = InfoHash(Default::default());
        ret.0.clone_from_slice(data);
        Ok(ret)
    }
}

impl FromStr for InfoHash {
    type Err = ConversionError;

    #[track_caller]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|source| ConversionError::InvalidHex {
            location: Location::caller(),
            source,
        })?;
        InfoHash::try_from(bytes.as_slice())
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct InfoHashVisitor;

impl Visitor<'_> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a 40 character hex encoded string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        InfoHash::from_str(v).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for InfoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(InfoHashVisitor)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::InfoHash;

    #[test]
    fn should_render_as_hex() {
        let info_hash = InfoHash([255u8; 20]);
        assert_eq!(info_hash.to_string(), "f".repeat(40));
    }

    #[test]
    fn should_parse_from_hex() {
        let info_hash = InfoHash::from_str(&"a".repeat(40)).unwrap();
        assert_eq!(info_hash.0, [0xaa; 20]);
    }

    #[test]
    fn should_reject_wrong_byte_length() {
        let bytes = [0u8; 19];
        assert!(InfoHash::try_from(&bytes[..]).is_err());
    }

    #[test]
    fn two_info_hashes_with_the_same_bytes_are_equal() {
        assert_eq!(InfoHash([0u8; 20]), InfoHash([0u8; 20]));
    }
}
