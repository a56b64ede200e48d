//! Client IP resolution for rate-limit keys.
//!
//! The storefront runs behind a proxy that sets `x-forwarded-for`; the first
//! entry is the original client.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};

/// Header set by the reverse proxy.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Key used when the client address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// First address in `x-forwarded-for`, trimmed, or `"unknown"`.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Extractor for the client address used in rate-limit keys.
///
/// ```rust,ignore
/// async fn handler(ClientIp(ip): ClientIp) -> String {
///     format!("hello {ip}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(&parts.headers)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_first_forwarded_address() {
        assert_eq!(client_ip(&headers("203.0.113.7, 10.0.0.1")), "203.0.113.7");
        assert_eq!(client_ip(&headers("  198.51.100.2 ")), "198.51.100.2");
    }

    #[test]
    fn test_unknown_when_missing_or_empty() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
        assert_eq!(client_ip(&headers("")), "unknown");
        assert_eq!(client_ip(&headers(" , 10.0.0.1")), "unknown");
    }

    #[tokio::test]
    async fn test_extractor() {
        let request = axum::http::Request::builder()
            .header(FORWARDED_FOR_HEADER, "192.0.2.1")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, "192.0.2.1");
    }
}
