//! `swarmkeeper`: a single-file `BitTorrent` tracker.
//!
//! The crate is split the way the tracker's own data flow is split: [`core`]
//! holds the bencode codec, the torrent construction pipeline, the
//! persistence port, and the announce/scrape protocol handler, none of
//! which know anything about HTTP. [`servers::http`] is the thin axum
//! binding that turns query strings into the parameter maps the core
//! expects. [`bootstrap`] wires logging and configuration together for the
//! `publish`/`serve` entry points in `src/main.rs`.

pub mod bootstrap;
pub mod core;
pub mod servers;

/// The clock the HTTP layer stamps announce/scrape requests with: the real
/// clock in production, the deterministic stopped clock under test.
#[cfg(not(test))]
pub(crate) type CurrentClock = swarmkeeper_clock::clock::Working;

#[cfg(test)]
pub(crate) type CurrentClock = swarmkeeper_clock::clock::Stopped;
