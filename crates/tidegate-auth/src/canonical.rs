//! Request canonicalization shared by the SigV4 and SigV2 builders.
//!
//! The canonical form of a request is what actually gets signed, so every
//! rule here must reproduce AWS behavior byte-for-byte:
//!
//! - path segments are decoded and re-escaped with the AWS URI escape set
//!   (S3 only; other services get plain lexical normalization),
//! - signature-carrying query parameters are dropped before the remainder is
//!   sorted and re-escaped,
//! - header names are renamed to the exact casing the AWS signers expect,
//!   via a fixed lookup table with title-casing as the fallback.
//!
//! All functions are pure; nothing here performs I/O or keeps state.

use http::HeaderMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// The set of characters that must be percent-encoded by the AWS URI escape.
///
/// Everything except unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`,
/// `~`) is encoded, with uppercase hex digits.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Query parameters that carry the signature itself and therefore never
/// participate in the canonical query string.
const SIGNATURE_QUERY_KEYS: &[&str] = &["X-Amz-Signature", "Signature", "Expires", "AWSAccessKeyId"];

/// Fixed lowercase-name to AWS-SDK-casing renames. Anything not listed is
/// title-cased per hyphen-delimited word. Note that two entries deliberately
/// stay lowercase.
const HEADER_CASING_MAP: &[(&str, &str)] = &[
    ("authorization", "Authorization"),
    ("content-md5", "Content-MD5"),
    ("content-type", "Content-Type"),
    ("cache-control", "Cache-Control"),
    ("x-amz-date", "X-Amz-Date"),
    ("x-amz-content-sha256", "X-Amz-Content-Sha256"),
    ("x-amz-security-token", "x-amz-security-token"),
    ("presigned-expires", "presigned-expires"),
];

/// Canonical query serialization style. Legacy V2 strips the `=` of
/// empty-valued parameters; V4 never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStyle {
    /// SigV4 canonical query string.
    V4,
    /// Legacy SigV2 canonical query string.
    V2,
}

/// AWS URI-escape a single token (path segment, query key, or query value).
///
/// # Examples
///
/// ```
/// use tidegate_auth::canonical::uri_escape;
///
/// assert_eq!(uri_escape("hello world"), "hello%20world");
/// assert_eq!(uri_escape("a=b@c"), "a%3Db%40c");
/// assert_eq!(uri_escape("safe-._~"), "safe-._~");
/// ```
#[must_use]
pub fn uri_escape(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Build the canonical URI for the given service.
///
/// `%2F` in the raw path is treated as a segment delimiter before splitting,
/// for clients that percent-encode slashes. For the S3 service each segment
/// is decoded and re-escaped with the AWS escape set; this reproduces the
/// interoperability fix for SDKs that leave characters like `= , ? $ @`
/// unescaped on the wire but escape them when signing. Other services get
/// plain percent-decoding plus lexical `.`/`..` normalization.
///
/// # Examples
///
/// ```
/// use tidegate_auth::canonical::canonical_uri;
///
/// assert_eq!(canonical_uri("/bucket/a=b", "s3"), "/bucket/a%3Db");
/// assert_eq!(canonical_uri("/bucket/a%3Db", "s3"), "/bucket/a%3Db");
/// assert_eq!(canonical_uri("/a/./b/../c", "sts"), "/a/c");
/// ```
#[must_use]
pub fn canonical_uri(raw_path: &str, service: &str) -> String {
    let path = raw_path.replace("%2F", "/");
    if service == "s3" {
        path.split('/')
            .map(|segment| {
                let decoded = percent_decode_str(segment).decode_utf8_lossy();
                uri_escape(&decoded)
            })
            .collect::<Vec<_>>()
            .join("/")
    } else {
        normalize_path(&percent_decode_str(&path).decode_utf8_lossy())
    }
}

/// Build the canonical query string from the decoded, ordered parameters.
///
/// Signature-carrying keys are dropped, the remainder is re-escaped and
/// sorted by key (duplicate keys sort by value), and for [`QueryStyle::V2`]
/// the trailing `=` of empty-valued parameters is stripped. An empty raw
/// query always canonicalizes to the empty string.
///
/// # Examples
///
/// ```
/// use tidegate_auth::canonical::{QueryStyle, build_canonical_query};
///
/// let params = vec![
///     ("b".to_owned(), "2".to_owned()),
///     ("a".to_owned(), "1".to_owned()),
///     ("Signature".to_owned(), "abc".to_owned()),
/// ];
/// assert_eq!(
///     build_canonical_query("b=2&a=1&Signature=abc", &params, QueryStyle::V4),
///     "a=1&b=2"
/// );
/// ```
#[must_use]
pub fn build_canonical_query(
    raw_query: &str,
    params: &[(String, String)],
    style: QueryStyle,
) -> String {
    if raw_query.is_empty() {
        return String::new();
    }

    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter(|(key, _)| !SIGNATURE_QUERY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (uri_escape(key), uri_escape(value)))
        .collect();
    pairs.sort_unstable();

    let joined = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    match style {
        QueryStyle::V4 => joined,
        QueryStyle::V2 => {
            let stripped = joined.strip_suffix('=').unwrap_or(&joined);
            // Escaped values never contain a literal `=`, so every `=&` left
            // at this point marks an empty-valued parameter.
            stripped.replace("=&", "&")
        }
    }
}

/// Rename a lowercase header name to the casing the AWS signers expect.
///
/// # Examples
///
/// ```
/// use tidegate_auth::canonical::aws_header_name;
///
/// assert_eq!(aws_header_name("content-md5"), "Content-MD5");
/// assert_eq!(aws_header_name("x-amz-security-token"), "x-amz-security-token");
/// assert_eq!(aws_header_name("x-custom-header"), "X-Custom-Header");
/// ```
#[must_use]
pub fn aws_header_name(lower_name: &str) -> String {
    for (from, to) in HEADER_CASING_MAP {
        if *from == lower_name {
            return (*to).to_owned();
        }
    }
    title_case_header(lower_name)
}

/// Collect the request headers into `(AWS-cased name, value)` pairs.
///
/// Repeated headers are joined with `,` in encounter order. Values that are
/// not valid UTF-8 collapse to the empty string.
#[must_use]
pub fn aws_cased_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| value.to_str().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(",");
            (aws_header_name(name.as_str()), joined)
        })
        .collect()
}

/// Build the SigV4 canonical header block and signed-header-names string.
///
/// Only headers in `signed_headers` participate; `None` means every header
/// is signable (this is what keeps chunked-upload presigned flows working).
/// Names are lowercased and sorted; values are trimmed with internal
/// whitespace runs collapsed to a single space. The block carries no
/// trailing newline; the canonical request format adds the separating blank
/// line.
#[must_use]
pub fn canonical_header_block(
    cased_headers: &[(String, String)],
    signed_headers: Option<&[String]>,
) -> (String, String) {
    let mut selected: Vec<(String, String)> = cased_headers
        .iter()
        .filter(|(name, _)| {
            signed_headers.is_none_or(|set| set.iter().any(|s| s == &name.to_lowercase()))
        })
        .map(|(name, value)| (name.to_lowercase(), collapse_whitespace(value.trim())))
        .collect();
    selected.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let block = selected
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let names = selected
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    (block, names)
}

/// Title-case a lowercase header name per hyphen-delimited word.
fn title_case_header(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Lexically normalize a decoded path: `.` segments drop, `..` pops.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut normalized = String::from("/");
    normalized.push_str(&segments.join("/"));
    if path.ends_with('/') && normalized.len() > 1 {
        normalized.push('/');
    }
    normalized
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::parse_query;

    #[test]
    fn test_should_escape_with_aws_rules() {
        assert_eq!(uri_escape("photos/puppy.jpg"), "photos%2Fpuppy.jpg");
        assert_eq!(uri_escape("a b*c"), "a%20b%2Ac");
        assert_eq!(uri_escape("unreserved-._~"), "unreserved-._~");
    }

    #[test]
    fn test_should_reescape_s3_path_segments() {
        // Characters some SDKs leave raw on the wire but escape when signing.
        assert_eq!(canonical_uri("/b/a=b,c?d$e@f", "s3"), "/b/a%3Db%2Cc%3Fd%24e%40f");
    }

    #[test]
    fn test_should_not_double_encode_s3_path() {
        assert_eq!(canonical_uri("/b/hello%20world", "s3"), "/b/hello%20world");
        assert_eq!(
            canonical_uri("/b/hello world", "s3"),
            canonical_uri("/b/hello%20world", "s3")
        );
    }

    #[test]
    fn test_should_treat_encoded_slash_as_delimiter() {
        assert_eq!(canonical_uri("/b/dir%2Fkey", "s3"), "/b/dir/key");
    }

    #[test]
    fn test_should_normalize_path_for_non_s3_services() {
        assert_eq!(canonical_uri("/a/b/../c/./d", "iam"), "/a/c/d");
        assert_eq!(canonical_uri("/a//b/", "sts"), "/a/b/");
        assert_eq!(canonical_uri("/%41/b", "sts"), "/A/b");
    }

    #[test]
    fn test_should_drop_signature_keys_from_query() {
        let raw = "X-Amz-Signature=abc&a=1&Signature=def&Expires=123&AWSAccessKeyId=AK";
        let params = parse_query(raw);
        assert_eq!(build_canonical_query(raw, &params, QueryStyle::V4), "a=1");
    }

    #[test]
    fn test_should_sort_query_by_key_then_value() {
        let raw = "b=2&a=1&b=1";
        let params = parse_query(raw);
        assert_eq!(
            build_canonical_query(raw, &params, QueryStyle::V4),
            "a=1&b=1&b=2"
        );
    }

    #[test]
    fn test_should_reescape_decoded_query_values() {
        let raw = "events=s3%3AObjectCreated%3A%2A&prefix=test";
        let params = parse_query(raw);
        assert_eq!(
            build_canonical_query(raw, &params, QueryStyle::V4),
            "events=s3%3AObjectCreated%3A%2A&prefix=test"
        );
    }

    #[test]
    fn test_should_strip_empty_values_for_v2_only() {
        let raw = "uploads=&acl=&max-keys=1";
        let params = parse_query(raw);
        assert_eq!(
            build_canonical_query(raw, &params, QueryStyle::V2),
            "acl&max-keys=1&uploads"
        );
        assert_eq!(
            build_canonical_query(raw, &params, QueryStyle::V4),
            "acl=&max-keys=1&uploads="
        );
    }

    #[test]
    fn test_should_canonicalize_empty_query_to_empty_string() {
        assert_eq!(build_canonical_query("", &[], QueryStyle::V4), "");
        assert_eq!(build_canonical_query("", &[], QueryStyle::V2), "");
    }

    #[test]
    fn test_should_rename_headers_via_fixed_table() {
        assert_eq!(aws_header_name("authorization"), "Authorization");
        assert_eq!(aws_header_name("x-amz-content-sha256"), "X-Amz-Content-Sha256");
        assert_eq!(aws_header_name("cache-control"), "Cache-Control");
        // These two stay lowercase by design of the upstream signers.
        assert_eq!(aws_header_name("x-amz-security-token"), "x-amz-security-token");
        assert_eq!(aws_header_name("presigned-expires"), "presigned-expires");
    }

    #[test]
    fn test_should_title_case_unmapped_headers() {
        assert_eq!(aws_header_name("x-amz-meta-color"), "X-Amz-Meta-Color");
        assert_eq!(aws_header_name("range"), "Range");
        assert_eq!(aws_header_name("user-agent"), "User-Agent");
    }

    #[test]
    fn test_should_join_repeated_headers_in_encounter_order() {
        let mut headers = HeaderMap::new();
        headers.append("x-custom", "first".parse().unwrap());
        headers.append("x-custom", "second".parse().unwrap());
        let cased = aws_cased_headers(&headers);
        assert_eq!(cased, vec![("X-Custom".to_owned(), "first,second".to_owned())]);
    }

    #[test]
    fn test_should_filter_header_block_by_signed_set() {
        let cased = vec![
            ("Host".to_owned(), "example.com".to_owned()),
            ("X-Amz-Date".to_owned(), "20130524T000000Z".to_owned()),
            ("Authorization".to_owned(), "AWS4-HMAC-SHA256 ...".to_owned()),
        ];
        let signed = vec!["host".to_owned(), "x-amz-date".to_owned()];
        let (block, names) = canonical_header_block(&cased, Some(&signed));
        assert_eq!(block, "host:example.com\nx-amz-date:20130524T000000Z");
        assert_eq!(names, "host;x-amz-date");
    }

    #[test]
    fn test_should_sign_all_headers_when_set_is_absent() {
        let cased = vec![
            ("X-Amz-Date".to_owned(), "20130524T000000Z".to_owned()),
            ("Host".to_owned(), "example.com".to_owned()),
        ];
        let (block, names) = canonical_header_block(&cased, None);
        assert_eq!(block, "host:example.com\nx-amz-date:20130524T000000Z");
        assert_eq!(names, "host;x-amz-date");
    }

    #[test]
    fn test_should_trim_and_collapse_header_values() {
        let cased = vec![("X-Custom".to_owned(), "  a   b   c  ".to_owned())];
        let (block, _) = canonical_header_block(&cased, None);
        assert_eq!(block, "x-custom:a b c");
    }

    #[test]
    fn test_should_omit_signed_header_missing_from_request() {
        let cased = vec![("Host".to_owned(), "example.com".to_owned())];
        let signed = vec!["host".to_owned(), "range".to_owned()];
        let (block, names) = canonical_header_block(&cased, Some(&signed));
        assert_eq!(block, "host:example.com");
        assert_eq!(names, "host");
    }
}
