//! Exposes a file on disk as an ordered sequence of fixed-size pieces.
//!
//! This is the only component that touches the filesystem directly; the
//! torrent builder drives it to hash pieces and to translate block reads
//! requested by (a future) data-transfer layer into byte offsets.
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::panic::Location;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open {path}: {source}, {location}")]
    Open {
        path: String,
        source: std::io::Error,
        location: &'static Location<'static>,
    },

    #[error("could not read {path}: {source}, {location}")]
    Read {
        path: String,
        source: std::io::Error,
        location: &'static Location<'static>,
    },

    #[error("block read out of bounds: offset {offset} + length {length} > size {size}, {location}")]
    BlockRead {
        offset: u64,
        length: u64,
        size: u64,
        location: &'static Location<'static>,
    },
}

/// A file, sliced into pieces of a fixed size for hashing and block reads.
pub struct FileSlicer {
    path: PathBuf,
    size: u64,
}

impl FileSlicer {
    /// Opens `path` and records its size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened or its metadata
    /// cannot be read.
    #[track_caller]
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
            location: Location::caller(),
        })?;
        let size = file
            .metadata()
            .map_err(|source| Error::Open {
                path: path.display().to_string(),
                source,
                location: Location::caller(),
            })?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            size,
        })
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Reads exactly `length` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockRead`] if the requested range runs past the end
    /// of the file, or [`Error::Open`]/[`Error::Read`] on I/O failure.
    #[track_caller]
    pub fn read_block(&self, offset: u64, length: u64) -> Result<Vec<u8>, Error> {
        if offset + length > self.size {
            return Err(Error::BlockRead {
                offset,
                length,
                size: self.size,
                location: Location::caller(),
            });
        }

        let mut file = File::open(&self.path).map_err(|source| Error::Open {
            path: self.path.display().to_string(),
            source,
            location: Location::caller(),
        })?;
        file.seek(SeekFrom::Start(offset)).map_err(|source| Error::Read {
            path: self.path.display().to_string(),
            source,
            location: Location::caller(),
        })?;

        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).map_err(|source| Error::Read {
            path: self.path.display().to_string(),
            source,
            location: Location::caller(),
        })?;
        Ok(buf)
    }

    /// Returns the number of pieces of size `piece_size` needed to cover the
    /// whole file (the last piece may be shorter).
    #[must_use]
    pub fn num_pieces(&self, piece_size: u32) -> u64 {
        self.size.div_ceil(u64::from(piece_size))
    }

    /// Hashes every piece sequentially, reading one piece-buffer of memory
    /// at a time, and returns the concatenated 20-byte `SHA-1` digests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`]/[`Error::Read`] on I/O failure.
    #[track_caller]
    pub fn hash_pieces(&self, piece_size: u32) -> Result<Vec<u8>, Error> {
        let mut file = File::open(&self.path).map_err(|source| Error::Open {
            path: self.path.display().to_string(),
            source,
            location: Location::caller(),
        })?;

        let mut pieces = Vec::new();
        let mut remaining = self.size;
        let piece_size = u64::from(piece_size);

        while remaining > 0 {
            let this_piece = remaining.min(piece_size);
            let mut buf = vec![0u8; this_piece as usize];
            file.read_exact(&mut buf).map_err(|source| Error::Read {
                path: self.path.display().to_string(),
                source,
                location: Location::caller(),
            })?;

            let mut hasher = Sha1::new();
            hasher.update(&buf);
            pieces.extend_from_slice(&hasher.finalize());

            remaining -= this_piece;
        }

        Ok(pieces)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sha1::{Digest, Sha1};
    use tempfile::NamedTempFile;

    use super::*;

    fn write_temp_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn hashes_an_exact_multiple_of_piece_size() {
        let content = vec![7u8; 32];
        let file = write_temp_file(&content);
        let slicer = FileSlicer::open(file.path()).unwrap();

        let pieces = slicer.hash_pieces(16).unwrap();
        assert_eq!(pieces.len(), 40); // two pieces * 20 bytes

        let mut expected = Vec::new();
        for chunk in content.chunks(16) {
            let mut hasher = Sha1::new();
            hasher.update(chunk);
            expected.extend_from_slice(&hasher.finalize());
        }
        assert_eq!(pieces, expected);
    }

    #[test]
    fn last_piece_may_be_shorter() {
        let content = vec![1u8; 10];
        let file = write_temp_file(&content);
        let slicer = FileSlicer::open(file.path()).unwrap();

        let pieces = slicer.hash_pieces(4).unwrap();
        assert_eq!(pieces.len(), 60); // ceil(10/4) = 3 pieces
    }

    #[test]
    fn read_block_rejects_out_of_bounds_reads() {
        let file = write_temp_file(&[0u8; 4]);
        let slicer = FileSlicer::open(file.path()).unwrap();

        assert!(slicer.read_block(0, 4).is_ok());
        assert!(slicer.read_block(1, 4).is_err());
        assert!(slicer.read_block(5, 0).is_err());
    }

    #[test]
    fn read_block_returns_exact_bytes() {
        let file = write_temp_file(b"hello world");
        let slicer = FileSlicer::open(file.path()).unwrap();

        assert_eq!(slicer.read_block(6, 5).unwrap(), b"world");
    }
}
