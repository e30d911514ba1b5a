//! Best-effort client IP extraction
//!
//! The value is informational, not cryptographically trustworthy: any
//! client can forge forwarding headers. Priority order matches what the
//! deployment's proxy chain populates: CF-Connecting-IP, then the first
//! X-Forwarded-For entry, then X-Real-IP, then the socket address.

use axum::http::HeaderMap;
use std::net::SocketAddr;

pub fn extract_client_ip(headers: &HeaderMap, socket_addr: Option<SocketAddr>) -> String {
    if let Some(ip) = header_value(headers, "cf-connecting-ip") {
        return ip;
    }

    if let Some(xff) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = xff
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return first.to_string();
        }
    }

    if let Some(ip) = header_value(headers, "x-real-ip") {
        return ip;
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn socket() -> Option<SocketAddr> {
        Some("192.0.2.7:443".parse().unwrap())
    }

    #[test]
    fn cf_connecting_ip_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.1"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.2, 10.0.0.1"),
        );
        assert_eq!(extract_client_ip(&headers, socket()), "203.0.113.1");
    }

    #[test]
    fn first_forwarded_for_entry_is_used() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.2, 10.0.0.1"),
        );
        assert_eq!(extract_client_ip(&headers, socket()), "198.51.100.2");
    }

    #[test]
    fn real_ip_beats_socket() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.9"));
        assert_eq!(extract_client_ip(&headers, socket()), "198.51.100.9");
    }

    #[test]
    fn falls_back_to_socket_then_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers, socket()), "192.0.2.7");
        assert_eq!(extract_client_ip(&headers, None), "unknown");
    }
}
