//! HTTP tracker.
//!
//! A `GET`-only server answering the two BitTorrent tracker requests:
//!
//! - `/announce`: a peer reports its progress and asks for the swarm.
//! - `/scrape`: a client asks for a torrent's aggregate swarm counts.
//!
//! Both routes extract the raw query string and the transport's remote
//! address and delegate to [`crate::core::protocol`], which does the actual
//! validation and bencoding. This module is deliberately thin: it owns
//! nothing the core doesn't already own, and knows nothing about the wire
//! format beyond "query string in, bencoded bytes out".
use std::sync::Arc;

use swarmkeeper_configuration::Configuration;

use crate::core::databases::Database;

pub mod handlers;
pub mod launcher;
pub mod routes;

/// State shared by every route: the persistence port and the loaded
/// configuration, both cheap to clone behind an `Arc`.
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub config: Configuration,
}
