//! Mapping of CouchDB status codes onto typed errors.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::body::{decode_body, Body};
use crate::error::{Error, Result};

/// Fail with [`Error::UnexpectedStatus`] if `status` is not in `expected`.
///
/// An empty allow-list accepts every status.
pub fn check_allowed(status: StatusCode, expected: &[StatusCode]) -> Result<()> {
    if expected.is_empty() || expected.contains(&status) {
        return Ok(());
    }
    Err(Error::UnexpectedStatus {
        expected: expected.iter().map(StatusCode::as_u16).collect(),
        actual: status.as_u16(),
    })
}

/// Evaluate a response status.
///
/// The error message is taken from `reason` when non-empty, then from the
/// body's `reason` and `error` fields, then falls back to a fixed default.
/// Statuses outside the known set are logged and treated as success.
pub fn evaluate_status(
    status: StatusCode,
    reason: Option<&str>,
    body: Option<&Body>,
    expected: &[StatusCode],
) -> Result<()> {
    check_allowed(status, expected)?;

    let message = |default: &str| select_message(reason, body, default);
    match status {
        StatusCode::OK
        | StatusCode::CREATED
        | StatusCode::ACCEPTED
        | StatusCode::NOT_MODIFIED => Ok(()),
        StatusCode::BAD_REQUEST => Err(Error::InvalidRequest {
            message: message("bad request"),
        }),
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized {
            message: message("unauthorized"),
        }),
        StatusCode::NOT_FOUND => Err(Error::NotFound {
            message: message("not found"),
        }),
        StatusCode::CONFLICT => Err(Error::AlreadyExists {
            message: message("conflict"),
        }),
        StatusCode::PRECONDITION_FAILED => Err(Error::AlreadyExists {
            message: message("precondition failed"),
        }),
        other => {
            tracing::warn!(status = other.as_u16(), "unexpected status code");
            Ok(())
        }
    }
}

/// Decode a buffered response body and evaluate its status.
///
/// Empty payloads (HEAD responses, 304s) are not decoded and yield `None`.
pub async fn evaluate_response(
    status: StatusCode,
    headers: &HeaderMap,
    payload: Bytes,
    expected: &[StatusCode],
) -> Result<Option<Body>> {
    check_allowed(status, expected)?;

    let body = if payload.is_empty() {
        None
    } else {
        Some(decode_body(headers, payload).await?)
    };

    evaluate_status(status, None, body.as_ref(), expected)?;
    Ok(body)
}

fn select_message(reason: Option<&str>, body: Option<&Body>, default: &str) -> String {
    reason
        .filter(|r| !r.is_empty())
        .or_else(|| body.and_then(|b| b.str_field("reason")))
        .or_else(|| body.and_then(|b| b.str_field("error")))
        .unwrap_or(default)
        .to_string()
}
