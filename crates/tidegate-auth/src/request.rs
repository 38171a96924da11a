//! Request view consumed by the signature subsystem.
//!
//! The HTTP layer owns parsing; this module only defines the read-only shape
//! it hands over: method, raw path, raw query string, decoded query
//! parameters in original order (duplicates preserved), headers, and the
//! optional extras a gateway front end resolves before authentication (body
//! digest, virtual-hosted bucket, client IP, STS session overlay).
//!
//! Everything derived from a [`SignableRequest`] lives and dies within one
//! request's authentication; nothing is cached across requests.

use std::net::IpAddr;

use http::{HeaderMap, Method, request::Parts};
use percent_encoding::percent_decode_str;

/// Read-only view of an inbound HTTP request, as supplied by the HTTP layer.
#[derive(Debug, Clone)]
pub struct SignableRequest {
    /// HTTP method.
    pub method: Method,
    /// Path exactly as received, still percent-encoded.
    pub raw_path: String,
    /// Query string exactly as received (no leading `?`), still encoded.
    pub raw_query: String,
    /// Decoded query parameters in original order, duplicates preserved.
    pub query_params: Vec<(String, String)>,
    /// Request headers. Duplicate values per name are preserved in order.
    pub headers: HeaderMap,
    /// Precomputed hex SHA-256 of the request body, when the HTTP layer has
    /// one (e.g. from `x-amz-content-sha256`). This subsystem never hashes
    /// the body itself.
    pub content_sha256: Option<String>,
    /// Bucket name resolved from a virtual-hosted-style `Host` header.
    pub virtual_hosted_bucket: Option<String>,
    /// Client IP, carried onto the auth token for logging and auditing.
    pub client_ip: Option<IpAddr>,
}

impl SignableRequest {
    /// Build a request view from [`http::request::Parts`].
    ///
    /// The optional fields start out unset; callers fill them in when the
    /// front end has resolved them.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let raw_query = parts.uri.query().unwrap_or("").to_owned();
        let query_params = parse_query(&raw_query);
        Self {
            method: parts.method.clone(),
            raw_path: parts.uri.path().to_owned(),
            raw_query,
            query_params,
            headers: parts.headers.clone(),
            content_sha256: None,
            virtual_hosted_bucket: None,
            client_ip: None,
        }
    }

    /// First value of a decoded query parameter, if present.
    #[must_use]
    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// STS session (assumed-role) credentials overlaying a base account identity.
///
/// When present, the authorization identity becomes
/// `assumed_role_access_key` while signature verification uses the temporary
/// `secret_key` issued for the session.
#[derive(Debug, Clone)]
pub struct SessionOverlay {
    /// Access key of the role the session assumed.
    pub assumed_role_access_key: String,
    /// Temporary access key issued for the session.
    pub access_key: String,
    /// Temporary secret key issued for the session.
    pub secret_key: String,
}

/// Decode a raw query string into ordered `(key, value)` pairs.
///
/// `+` decodes to a space and percent-escapes are resolved, matching what
/// URL-decoding front ends hand to application code. Parameters without a
/// `=` get an empty value.
#[must_use]
pub fn parse_query(raw_query: &str) -> Vec<(String, String)> {
    raw_query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            (url_decode(key), url_decode(value))
        })
        .collect()
}

fn url_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}
