//! Authentication error types.
//!
//! Every failure in this subsystem is terminal for the request: nothing here
//! is retried. Extraction failures abort before any token is built, and the
//! presigned expiry checks run independently of signature correctness, so an
//! expired-but-correctly-signed request still fails with [`AuthError::RequestExpired`].

/// Errors produced while authenticating an inbound request or verifying its
/// signature against an account record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header or presigned query parameters did not match
    /// any known signing grammar. Surfaced as an invalid-argument protocol error.
    #[error("malformed authorization header or presigned query parameters")]
    MalformedAuthHeader,

    /// The request date does not start with the date component of the
    /// credential scope. Checked before any signature computation.
    #[error("request date does not match the credential scope date")]
    DateMismatch,

    /// `X-Amz-Expires` was negative.
    #[error("X-Amz-Expires must be non-negative")]
    ExpiryNonNegativeViolation,

    /// The presigned expiry window exceeds the seven-day maximum.
    #[error("presigned expiry exceeds the maximum of 604800 seconds")]
    ExpiryTooLong,

    /// The presigned URL has expired.
    #[error("presigned request has expired")]
    RequestExpired,

    /// No access key on the resolved account matches the token's access key.
    #[error("access key not found on the requesting account")]
    InvalidAccessKeyId,

    /// The matching access key exists but has been deactivated.
    #[error("access key has been deactivated")]
    DeactivatedAccessKeyId,

    /// The recomputed signature does not match the one the client provided.
    #[error("the calculated signature does not match the provided signature")]
    SignatureDoesNotMatch,

    /// A required field was unexpectedly absent on an account record.
    /// Always logged at the call site, never silently ignored.
    #[error("internal error: {0}")]
    InternalError(String),

    /// The external account directory could not be reached. This is the
    /// dependency's fault, not the client's, and is never retried here.
    #[error("account directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_error_messages() {
        assert_eq!(
            AuthError::SignatureDoesNotMatch.to_string(),
            "the calculated signature does not match the provided signature"
        );
        assert_eq!(
            AuthError::InternalError("missing secret_key".to_owned()).to_string(),
            "internal error: missing secret_key"
        );
    }

    #[test]
    fn test_should_compare_error_variants() {
        assert_eq!(AuthError::RequestExpired, AuthError::RequestExpired);
        assert_ne!(AuthError::RequestExpired, AuthError::ExpiryTooLong);
    }
}
