//! Builds a [`TorrentRecord`] (and the bencoded `.torrent` blob clients
//! download) from a file on disk plus the piece size and tracker list the
//! publisher chose.
use std::cell::OnceCell;
use std::panic::Location;

use sha1::{Digest, Sha1};
use swarmkeeper_bencode::Value;
use swarmkeeper_primitives::InfoHash;

use crate::core::file_slicer::{self, FileSlicer};
use crate::core::models::{AnnounceList, TorrentRecord, TorrentStatus};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("piece size must be greater than zero, got {piece_size}, {location}")]
    InvalidPieceSize {
        piece_size: i64,
        location: &'static Location<'static>,
    },

    #[error("piece index {piece_index} is out of range for {num_pieces} pieces, {location}")]
    InvalidPieceIndex {
        piece_index: u64,
        num_pieces: u64,
        location: &'static Location<'static>,
    },

    #[error("block begin {block_begin} + length {length} exceeds piece size {piece_size}, {location}")]
    InvalidBlockRange {
        block_begin: u32,
        length: u32,
        piece_size: u32,
        location: &'static Location<'static>,
    },

    #[error(transparent)]
    FileSlicer(#[from] file_slicer::Error),
}

/// Builds a single-file torrent's metadata, deriving pieces and info-hash
/// lazily and memoizing them once computed.
pub struct TorrentBuilder {
    slicer: FileSlicer,
    piece_length: u32,
    name: String,
    announce_list: AnnounceList,
    url_list: Vec<String>,
    private: bool,
    created_by: Option<String>,
    pieces: OnceCell<Vec<u8>>,
    info_hash: OnceCell<InfoHash>,
}

impl TorrentBuilder {
    /// # Errors
    ///
    /// Returns [`Error::InvalidPieceSize`] if `piece_length` is not
    /// positive.
    #[track_caller]
    pub fn new(
        slicer: FileSlicer,
        piece_length: u32,
        announce_list: AnnounceList,
        url_list: Vec<String>,
        private: bool,
        created_by: Option<String>,
    ) -> Result<Self, Error> {
        if piece_length == 0 {
            return Err(Error::InvalidPieceSize {
                piece_size: 0,
                location: Location::caller(),
            });
        }

        let name = slicer.basename();

        Ok(Self {
            slicer,
            piece_length,
            name,
            announce_list,
            url_list,
            private,
            created_by,
            pieces: OnceCell::new(),
            info_hash: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        self.slicer.size()
    }

    #[must_use]
    pub fn piece_length(&self) -> u32 {
        self.piece_length
    }

    /// Lazily hashes every piece of the underlying file and memoizes the
    /// concatenated digests.
    ///
    /// # Errors
    ///
    /// Propagates [`file_slicer::Error`] from the underlying read.
    pub fn pieces(&self) -> Result<&[u8], Error> {
        if self.pieces.get().is_none() {
            let hashed = self.slicer.hash_pieces(self.piece_length)?;
            // OnceCell::set can only fail if already set, which get() above ruled out.
            let _ = self.pieces.set(hashed);
        }
        Ok(self.pieces.get().expect("just initialized"))
    }

    /// Builds the 4-key `info` sub-dictionary the info-hash is derived from:
    /// `length`, `name`, `piece length`, `pieces`. `private` must never be
    /// folded into this dict — the info-hash is defined over these four keys
    /// regardless of whether the torrent is private.
    fn info_dict(&self) -> Result<Value, Error> {
        let pieces = self.pieces()?.to_vec();
        Ok(Value::dict()
            .entry("length", Value::Int(i64::try_from(self.length()).unwrap_or(i64::MAX)))
            .entry("name", Value::string(&self.name))
            .entry("piece length", Value::Int(i64::from(self.piece_length)))
            .entry("pieces", Value::bytes(pieces))
            .build())
    }

    /// Builds the `info` dict as published in the `.torrent` file: the
    /// hashing dict plus `private` when set. Never feed this into the
    /// info-hash derivation.
    fn info_dict_for_torrent_file(&self) -> Result<Value, Error> {
        let Value::Dict(mut entries) = self.info_dict()? else {
            unreachable!("info_dict always builds a Value::Dict")
        };
        if self.private {
            entries.insert(b"private".to_vec(), Value::Int(1));
        }
        Ok(Value::Dict(entries))
    }

    /// Derives the 20-byte info-hash: `SHA1(bencode(info_dict))`, memoized
    /// after first computation.
    ///
    /// # Errors
    ///
    /// Propagates [`file_slicer::Error`] from piece hashing.
    pub fn info_hash(&self) -> Result<InfoHash, Error> {
        if let Some(hash) = self.info_hash.get() {
            return Ok(*hash);
        }

        let encoded = swarmkeeper_bencode::encode(&self.info_dict()?);
        let mut hasher = Sha1::new();
        hasher.update(&encoded);
        let digest: [u8; 20] = hasher.finalize().into();
        let hash = InfoHash::from(digest);

        let _ = self.info_hash.set(hash);
        Ok(hash)
    }

    /// Merges the builder's own announce list (if any) with a
    /// caller-supplied one, removing duplicate tiers while preserving
    /// order, and wrapping bare-string tiers into single-element lists.
    #[must_use]
    pub fn merged_announce_list(&self, extra: &AnnounceList) -> AnnounceList {
        let mut merged = self.announce_list.clone();
        for tier in extra {
            if !merged.contains(tier) {
                merged.push(tier.clone());
            }
        }
        merged
    }

    /// Assembles a [`TorrentRecord`] ready for the persistence port.
    ///
    /// # Errors
    ///
    /// Propagates [`file_slicer::Error`] from piece hashing.
    pub fn build_record(&self) -> Result<TorrentRecord, Error> {
        Ok(TorrentRecord {
            info_hash: self.info_hash()?,
            name: self.name.clone(),
            length: self.length(),
            piece_length: self.piece_length,
            pieces: self.pieces()?.to_vec(),
            announce_list: self.announce_list.clone(),
            url_list: self.url_list.clone(),
            private: self.private,
            created_by: self.created_by.clone(),
            status: TorrentStatus::Active,
        })
    }

    /// Builds the bencoded `.torrent` file contents.
    ///
    /// # Errors
    ///
    /// Propagates [`file_slicer::Error`] from piece hashing.
    pub fn build_torrent_file(&self) -> Result<Vec<u8>, Error> {
        let announce_list = self.merged_announce_list(&[]);
        let announce = announce_list
            .first()
            .and_then(|tier| tier.first())
            .cloned()
            .unwrap_or_default();

        let mut dict = Value::dict().entry("announce", Value::string(&announce)).entry(
            "announce-list",
            Value::List(
                announce_list
                    .iter()
                    .map(|tier| Value::List(tier.iter().map(|url| Value::string(url)).collect()))
                    .collect(),
            ),
        );

        if let Some(created_by) = &self.created_by {
            dict = dict.entry("created by", Value::string(created_by));
        }
        if !self.url_list.is_empty() {
            dict = dict.entry(
                "url-list",
                Value::List(self.url_list.iter().map(|url| Value::string(url)).collect()),
            );
        }
        dict = dict.entry("info", self.info_dict_for_torrent_file()?);

        Ok(swarmkeeper_bencode::encode(&dict.build()))
    }

    /// Translates a `(piece_index, block_begin, length)` triple into a file
    /// offset and reads it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPieceIndex`]/[`Error::InvalidBlockRange`] if
    /// the coordinates fall outside the torrent's geometry, or propagates
    /// [`file_slicer::Error`] from the read.
    #[track_caller]
    pub fn read_block(&self, piece_index: u64, block_begin: u32, length: u32) -> Result<Vec<u8>, Error> {
        let num_pieces = self.slicer.num_pieces(self.piece_length);
        if num_pieces == 0 || piece_index > num_pieces - 1 {
            return Err(Error::InvalidPieceIndex {
                piece_index,
                num_pieces,
                location: Location::caller(),
            });
        }
        if u64::from(block_begin) + u64::from(length) > u64::from(self.piece_length) {
            return Err(Error::InvalidBlockRange {
                block_begin,
                length,
                piece_size: self.piece_length,
                location: Location::caller(),
            });
        }

        let offset = piece_index * u64::from(self.piece_length) + u64::from(block_begin);
        Ok(self.slicer.read_block(offset, u64::from(length))?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn builder_for(content: &[u8], piece_length: u32) -> (NamedTempFile, TorrentBuilder) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        let slicer = FileSlicer::open(file.path()).unwrap();
        let builder = TorrentBuilder::new(slicer, piece_length, vec![], vec![], false, None).unwrap();
        (file, builder)
    }

    #[test]
    fn info_hash_is_stable_regardless_of_announce_list() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let without_trackers =
            TorrentBuilder::new(FileSlicer::open(file.path()).unwrap(), 4, vec![], vec![], false, None).unwrap();
        let with_trackers = TorrentBuilder::new(
            FileSlicer::open(file.path()).unwrap(),
            4,
            vec![vec!["http://tracker.example/announce".to_string()]],
            vec![],
            false,
            None,
        )
        .unwrap();

        assert_eq!(without_trackers.info_hash().unwrap(), with_trackers.info_hash().unwrap());
    }

    #[test]
    fn rejects_zero_piece_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();
        let slicer = FileSlicer::open(file.path()).unwrap();
        assert!(TorrentBuilder::new(slicer, 0, vec![], vec![], false, None).is_err());
    }

    #[test]
    fn read_block_validates_geometry() {
        let (_file, builder) = builder_for(b"0123456789abcdef", 4);
        assert_eq!(builder.read_block(0, 0, 4).unwrap(), b"0123");
        assert_eq!(builder.read_block(3, 0, 4).unwrap(), b"cdef");
        assert!(builder.read_block(4, 0, 4).is_err());
        assert!(builder.read_block(0, 2, 4).is_err());
    }

    #[test]
    fn info_hash_is_unaffected_by_the_private_flag() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let public = TorrentBuilder::new(FileSlicer::open(file.path()).unwrap(), 4, vec![], vec![], false, None).unwrap();
        let private = TorrentBuilder::new(FileSlicer::open(file.path()).unwrap(), 4, vec![], vec![], true, None).unwrap();

        assert_eq!(public.info_hash().unwrap(), private.info_hash().unwrap());
    }

    #[test]
    fn torrent_file_info_dict_carries_private_but_info_hash_does_not() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"content").unwrap();
        file.flush().unwrap();
        let slicer = FileSlicer::open(file.path()).unwrap();
        let builder = TorrentBuilder::new(slicer, 4, vec![], vec![], true, None).unwrap();

        let bytes = builder.build_torrent_file().unwrap();
        let decoded = swarmkeeper_bencode::decode(&bytes).unwrap();
        let info = decoded.get("info").unwrap();
        assert_eq!(info.get("private").and_then(Value::as_int), Some(1));

        let rehashed_encoded = swarmkeeper_bencode::encode(&builder.info_dict().unwrap());
        let mut hasher = Sha1::new();
        hasher.update(&rehashed_encoded);
        let digest: [u8; 20] = hasher.finalize().into();
        assert_eq!(builder.info_hash().unwrap(), InfoHash::from(digest));
    }

    #[test]
    fn torrent_file_announce_is_first_url_of_first_tier() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"content").unwrap();
        file.flush().unwrap();
        let slicer = FileSlicer::open(file.path()).unwrap();
        let builder = TorrentBuilder::new(
            slicer,
            4,
            vec![vec!["http://a.example/announce".to_string(), "http://b.example/announce".to_string()]],
            vec![],
            false,
            None,
        )
        .unwrap();

        let bytes = builder.build_torrent_file().unwrap();
        let decoded = swarmkeeper_bencode::decode(&bytes).unwrap();
        assert_eq!(
            decoded.get("announce").and_then(swarmkeeper_bencode::Value::as_bytes),
            Some(b"http://a.example/announce".as_slice())
        );
    }
}
