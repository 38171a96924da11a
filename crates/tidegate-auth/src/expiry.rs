//! Presigned-URL expiry enforcement.
//!
//! Only query-string presigned requests carry an expiry window; header-based
//! authentication is never expiry-checked. The check runs independently of
//! signature verification, so an expired-but-correctly-signed request is
//! still rejected.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tracing::warn;

use crate::error::AuthError;
use crate::request::SignableRequest;

/// Maximum presigned validity window: 7 days.
const MAX_EXPIRY_SECONDS: i64 = 604_800;

/// Format of `X-Amz-Date` timestamps (ISO 8601 basic).
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Enforce the presigned expiry window of a request, if it carries one.
///
/// Requests without presigned expiry parameters pass unchanged.
pub fn check_request_expiry(req: &SignableRequest) -> Result<(), AuthError> {
    check_request_expiry_at(req, Utc::now())
}

/// [`check_request_expiry`] against an explicit clock.
///
/// An `X-Amz-Expires` or `Expires` value that is not a valid integer is
/// rejected as [`AuthError::MalformedAuthHeader`] rather than skipping the
/// expiry checks. Rejections are logged with request context.
pub fn check_request_expiry_at(
    req: &SignableRequest,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    enforce_expiry_window(req, now).inspect_err(|err| {
        warn!(
            method = %req.method,
            path = %req.raw_path,
            client_ip = ?req.client_ip,
            %err,
            "rejected presigned request expiry"
        );
    })
}

fn enforce_expiry_window(req: &SignableRequest, now: DateTime<Utc>) -> Result<(), AuthError> {
    if let (Some(date), Some(expires)) = (
        req.query_first("X-Amz-Date"),
        req.query_first("X-Amz-Expires"),
    ) {
        let expires_seconds: i64 = expires
            .parse()
            .map_err(|_| AuthError::MalformedAuthHeader)?;
        check_expiry_non_negative(expires_seconds)?;
        check_expiry_limit(expires_seconds)?;
        check_expiry_v4(date, expires_seconds, now)
    } else if let Some(expires) = req.query_first("Expires") {
        let expires_epoch: i64 = expires
            .parse()
            .map_err(|_| AuthError::MalformedAuthHeader)?;
        // The limit applies to the remaining duration, not the raw epoch.
        // `i64::div_ceil` is still unstable; compute the ceiling division manually.
        let now_millis = now.timestamp_millis();
        let now_seconds = now_millis.div_euclid(1000) + i64::from(now_millis.rem_euclid(1000) != 0);
        let remaining_seconds = expires_epoch - now_seconds;
        check_expiry_limit(remaining_seconds)?;
        check_expiry_v2(expires_epoch, now)
    } else {
        Ok(())
    }
}

/// V4: absolute expiry is `X-Amz-Date` plus the window.
fn check_expiry_v4(
    date: &str,
    expires_seconds: i64,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let request_time = NaiveDateTime::parse_from_str(date, AMZ_DATE_FORMAT)
        .map_err(|_| AuthError::MalformedAuthHeader)?;
    let expiry = request_time + Duration::seconds(expires_seconds);
    if now.naive_utc() > expiry {
        return Err(AuthError::RequestExpired);
    }
    Ok(())
}

/// Legacy: `Expires` is an absolute epoch in seconds.
fn check_expiry_v2(expires_epoch: i64, now: DateTime<Utc>) -> Result<(), AuthError> {
    if now.timestamp_millis() > expires_epoch * 1000 {
        return Err(AuthError::RequestExpired);
    }
    Ok(())
}

fn check_expiry_non_negative(expiry_seconds: i64) -> Result<(), AuthError> {
    if expiry_seconds < 0 {
        return Err(AuthError::ExpiryNonNegativeViolation);
    }
    Ok(())
}

fn check_expiry_limit(expiry_seconds: i64) -> Result<(), AuthError> {
    if expiry_seconds > MAX_EXPIRY_SECONDS {
        return Err(AuthError::ExpiryTooLong);
    }
    Ok(())
}
