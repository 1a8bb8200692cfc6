//! Everything the tracker knows and does that isn't HTTP: the bencode
//! codec, torrent publishing, the persistence port, and the announce/scrape
//! protocol handler.

pub mod bencode;
pub mod databases;
pub mod file_slicer;
pub mod models;
pub mod protocol;
pub mod swarm;
pub mod torrent_builder;
