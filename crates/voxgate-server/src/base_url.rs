//! Externally visible base URL for callback links.
//!
//! The carrier must be able to reach the callback URL we hand it, so the
//! URL is rebuilt from how the request actually arrived: reverse-proxy
//! headers first, then the direct `Host` header, then a configured host.

use axum::http::{header, HeaderMap};

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";
const DEFAULT_PROTO: &str = "https";

/// First non-empty entry of a possibly comma-separated header.
///
/// Proxy chains append to forwarded headers, so the left-most value is the
/// one the client used.
fn first_value<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Returns `proto://host` for the current request, without a trailing slash.
pub fn resolve_base_url(headers: &HeaderMap, fallback_host: &str) -> String {
    let proto = first_value(headers, FORWARDED_PROTO).unwrap_or(DEFAULT_PROTO);
    let host = first_value(headers, FORWARDED_HOST)
        .or_else(|| first_value(headers, header::HOST))
        .unwrap_or(fallback_host);
    format!("{}://{}", proto, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_headers_win() {
        let h = headers(&[
            ("x-forwarded-host", "public.example.com"),
            ("x-forwarded-proto", "http"),
            ("host", "10.0.0.5:3000"),
        ]);
        assert_eq!(
            resolve_base_url(&h, "fallback.example"),
            "http://public.example.com"
        );
    }

    #[test]
    fn host_header_used_without_forwarding() {
        let h = headers(&[("host", "direct.example.com:8443")]);
        assert_eq!(
            resolve_base_url(&h, "fallback.example"),
            "https://direct.example.com:8443"
        );
    }

    #[test]
    fn fallback_host_used_when_no_headers() {
        assert_eq!(
            resolve_base_url(&HeaderMap::new(), "fallback.example"),
            "https://fallback.example"
        );
    }

    #[test]
    fn first_entry_of_proxy_chain_is_used() {
        let h = headers(&[
            ("x-forwarded-host", "edge.example.com, inner.local"),
            ("x-forwarded-proto", "https,http"),
        ]);
        assert_eq!(resolve_base_url(&h, "x"), "https://edge.example.com");
    }

    #[test]
    fn blank_forwarded_host_falls_through_to_host() {
        let h = headers(&[("x-forwarded-host", " "), ("host", "direct.example.com")]);
        assert_eq!(resolve_base_url(&h, "x"), "https://direct.example.com");
    }
}
