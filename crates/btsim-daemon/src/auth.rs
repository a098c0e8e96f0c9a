//! Bearer-token extraction: "Per-request bearer token in a header maps to
//! exactly one account; an admin token authorizes cross-account operations.
//! Unknown/invalid tokens -> UNAUTHORIZED".

use axum::http::HeaderMap;

use btsim_schemas::{AccountError, BtsimError};

/// Pulls the bearer token out of `Authorization: Bearer <token>`.
/// `BAD_PARAMETER`-family malformed headers are folded into `UNAUTHORIZED`:
///  draws no distinction between "missing" and "malformed" here.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, BtsimError> {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(BtsimError::AccountError(AccountError::Unauthorized))?;
    raw.strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(BtsimError::AccountError(AccountError::Unauthorized))
}
