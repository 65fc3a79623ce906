//! Caller ip resolution

use std::net::SocketAddr;

use contracts::X_FORWARDED_FOR;
use http::HeaderMap;

/// Best-effort caller ip
///
/// The left-most `X-Forwarded-For` entry wins; otherwise the peer address.
/// Returns None when neither yields anything.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    forwarded_for(headers).or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .map(String::from)
}
