//! Announce events, as described in
//! [BEP 3, The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html).
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Hash, Clone, Copy, Debug, Display, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AnnounceEvent {
    /// The peer has started downloading the torrent.
    #[display("started")]
    Started,
    /// The peer has ceased downloading the torrent.
    #[display("stopped")]
    Stopped,
    /// The peer has completed downloading the torrent.
    #[display("completed")]
    Completed,
    /// One of the announcements done at regular intervals; not a transition.
    #[display("")]
    #[default]
    None,
}

impl AnnounceEvent {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "started" => Self::Started,
            "stopped" => Self::Stopped,
            "completed" => Self::Completed,
            _ => Self::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AnnounceEvent;

    #[test]
    fn unknown_strings_parse_as_none() {
        assert_eq!(AnnounceEvent::parse("paused"), AnnounceEvent::None);
        assert_eq!(AnnounceEvent::parse(""), AnnounceEvent::None);
    }

    #[test]
    fn recognised_strings_parse_to_their_variant() {
        assert_eq!(AnnounceEvent::parse("started"), AnnounceEvent::Started);
        assert_eq!(AnnounceEvent::parse("stopped"), AnnounceEvent::Stopped);
        assert_eq!(AnnounceEvent::parse("completed"), AnnounceEvent::Completed);
    }
}
