//! Axum handlers for the `announce` and `scrape` requests.
//!
//! `info_hash` and `peer_id` are percent-encoded over raw, non-UTF8-safe
//! bytes (BEP 03), so the query string is parsed by hand rather than with
//! axum's `Query` extractor, which assumes UTF-8 values.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use swarmkeeper_clock::clock::Time;
use swarmkeeper_configuration::Configuration;

use crate::core::protocol::{self, Params};
use crate::servers::http::AppState;
use crate::CurrentClock;

/// Bencoded tracker responses are served as `text/plain`, per the
/// long-standing BitTorrent tracker convention (clients don't negotiate
/// content types; this is what every tracker implementation sends).
fn bencoded_response(bytes: Vec<u8>) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], bytes).into_response()
}

/// Resolves the address the protocol handler should treat as "the
/// transport's remote address". When `on_reverse_proxy` is set, that's the
/// right-most IP of `X-Forwarded-For` (the hop closest to this tracker's own
/// trusted reverse proxy); otherwise it's the raw TCP peer address. Falls
/// back to the TCP peer address if the header is missing or unparseable —
/// the protocol handler's own `ip` query override still takes precedence
/// over either.
fn resolve_remote_addr(config: &Configuration, headers: &HeaderMap, connection_addr: SocketAddr) -> SocketAddr {
    if !config.on_reverse_proxy {
        return connection_addr;
    }

    let Some(ip) = right_most_x_forwarded_for(headers) else {
        tracing::warn!("on_reverse_proxy is set but X-Forwarded-For is missing or invalid");
        return connection_addr;
    };

    SocketAddr::new(ip, connection_addr.port())
}

fn right_most_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get("x-forwarded-for")?.to_str().ok()?;
    value.rsplit(',').find_map(|hop| hop.trim().parse::<IpAddr>().ok())
}

/// Splits a raw query string into a percent-decoded parameter mapping.
///
/// Empty and key-less segments (a bare `&&` or a trailing `&`) are skipped
/// rather than treated as errors; the protocol handler's own `require_keys`
/// check is what rejects a request for missing parameters.
fn parse_params(raw_query: &str) -> Params {
    raw_query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = percent_encoding::percent_decode_str(key).decode_utf8_lossy().into_owned();
            let value = percent_encoding::percent_decode_str(value).collect::<Vec<u8>>();
            Some((key, value))
        })
        .collect()
}

#[allow(clippy::unused_async)]
pub async fn announce(
    State(state): State<Arc<AppState>>,
    ConnectInfo(connection_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let params = parse_params(raw_query.as_deref().unwrap_or_default());
    let remote_addr = resolve_remote_addr(&state.config, &headers, connection_addr);
    tracing::debug!(?remote_addr, "http announce request");

    let bytes = protocol::announce(state.db.as_ref(), &state.config, &params, remote_addr, CurrentClock::now()).await;
    bencoded_response(bytes)
}

#[allow(clippy::unused_async)]
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let params = parse_params(raw_query.as_deref().unwrap_or_default());
    tracing::debug!(?remote_addr, "http scrape request");

    let bytes = protocol::scrape(state.db.as_ref(), &params, CurrentClock::now()).await;
    bencoded_response(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percent_encoded_values() {
        let params = parse_params("peer_id=%2DqB0000&port=6881");
        assert_eq!(params.get("peer_id"), Some(&b"-qB0000".to_vec()));
        assert_eq!(params.get("port"), Some(&b"6881".to_vec()));
    }

    #[test]
    fn tolerates_an_empty_query_string() {
        assert!(parse_params("").is_empty());
    }

    #[test]
    fn reverse_proxy_mode_prefers_the_right_most_forwarded_ip() {
        let config = Configuration {
            on_reverse_proxy: true,
            ..Configuration::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.195, 70.41.3.18".parse().unwrap());
        let connection_addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        let resolved = resolve_remote_addr(&config, &headers, connection_addr);
        assert_eq!(resolved.ip(), "70.41.3.18".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn reverse_proxy_mode_falls_back_without_the_header() {
        let config = Configuration {
            on_reverse_proxy: true,
            ..Configuration::default()
        };
        let headers = HeaderMap::new();
        let connection_addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        let resolved = resolve_remote_addr(&config, &headers, connection_addr);
        assert_eq!(resolved, connection_addr);
    }

    #[test]
    fn default_mode_ignores_the_forwarded_header() {
        let config = Configuration::default();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.195".parse().unwrap());
        let connection_addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        let resolved = resolve_remote_addr(&config, &headers, connection_addr);
        assert_eq!(resolved, connection_addr);
    }

    #[test]
    fn skips_trailing_ampersands() {
        let params = parse_params("port=6881&");
        assert_eq!(params.len(), 1);
    }
}
