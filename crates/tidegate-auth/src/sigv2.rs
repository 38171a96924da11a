//! Legacy AWS Signature Version 2 string-to-sign construction and signing.
//!
//! The V2 string to sign:
//!
//! ```text
//! HTTP-Verb + "\n" +
//! Content-MD5 + "\n" +
//! Content-Type + "\n" +
//! (Expires-or-Date) + "\n" +
//! CanonicalizedAmzHeaders +
//! CanonicalizedResource
//! ```
//!
//! where the date slot carries the presigned `Expires` query value when
//! present and the `Date` header otherwise, and
//! `Signature = Base64(HMAC-SHA1(SecretKey, StringToSign))`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;
use tracing::debug;

use crate::canonical::{QueryStyle, aws_cased_headers, build_canonical_query};
use crate::request::SignableRequest;

type HmacSha1 = Hmac<Sha1>;

/// S3 sub-resources that must be included in the canonicalized resource.
const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "restore",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Build the V2 string to sign for an inbound request.
#[must_use]
pub fn string_to_sign_v2(req: &SignableRequest) -> String {
    let cased = aws_cased_headers(&req.headers);
    let lookup = |name: &str| {
        cased
            .iter()
            .find(|(key, _)| key == name)
            .map_or("", |(_, value)| value.as_str())
    };

    let method = req.method.as_str();
    let content_md5 = lookup("Content-MD5");
    let content_type = lookup("Content-Type");
    // Presigned requests sign the Expires epoch where header auth signs the
    // Date header.
    let date_slot = req.query_first("Expires").unwrap_or_else(|| lookup("Date"));

    let amz_headers = canonicalized_amz_headers(&cased);
    let resource = canonicalized_resource(req);

    let string_to_sign =
        format!("{method}\n{content_md5}\n{content_type}\n{date_slot}\n{amz_headers}{resource}");

    debug!(
        method = %req.method,
        path = %req.raw_path,
        "built v2 string to sign"
    );

    string_to_sign
}

/// Compute the V2 signature: `Base64(HMAC-SHA1(secret, string_to_sign))`.
#[must_use]
pub fn compute_signature_v2(secret_key: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Build the CanonicalizedAmzHeaders block: every `x-amz-*` header,
/// lowercased and sorted, one `name:value\n` line each.
fn canonicalized_amz_headers(cased_headers: &[(String, String)]) -> String {
    let mut amz: Vec<(String, &str)> = cased_headers
        .iter()
        .filter(|(name, _)| name.to_lowercase().starts_with("x-amz-"))
        .map(|(name, value)| (name.to_lowercase(), value.as_str()))
        .collect();
    amz.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut result = String::new();
    for (name, value) in amz {
        result.push_str(&name);
        result.push(':');
        result.push_str(value);
        result.push('\n');
    }
    result
}

/// Build the CanonicalizedResource: optional virtual-hosted bucket prefix,
/// the path, and any S3 sub-resource parameters sorted by name.
fn canonicalized_resource(req: &SignableRequest) -> String {
    let path = req.raw_path.replace("%2F", "/");
    let query = build_canonical_query(&req.raw_query, &req.query_params, QueryStyle::V2);

    let mut resource = String::new();
    if let Some(bucket) = req.virtual_hosted_bucket.as_deref() {
        resource.push('/');
        resource.push_str(bucket);
    }
    resource.push_str(&path);

    let mut sub_params: Vec<(&str, Option<&str>)> = query
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| match param.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (param, None),
        })
        .filter(|(key, _)| SUB_RESOURCES.contains(key))
        .collect();
    sub_params.sort_unstable_by(|a, b| a.0.cmp(b.0));

    if !sub_params.is_empty() {
        let joined: Vec<String> = sub_params
            .iter()
            .map(|(key, value)| match value {
                Some(value) => format!("{key}={value}"),
                None => (*key).to_owned(),
            })
            .collect();
        resource.push('?');
        resource.push_str(&joined.join("&"));
    }

    resource
}
