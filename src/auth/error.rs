// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Every credential failure collapses into [`AuthError::Unauthenticated`];
//! the reason is logged at debug level by the resolver and never sent to
//! the client.

use std::time::Duration;

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, malformed, tampered or expired credential, or a principal
    /// that is deleted, banned or unverified.
    Unauthenticated,
    /// Authenticated, but not allowed to do this.
    Forbidden,
    /// Login throttle tripped.
    TooManyRequests { retry_after: Duration },
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    message: String,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Whole seconds until the caller may retry, rounded up.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AuthError::TooManyRequests { retry_after } => {
                let secs = retry_after.as_secs();
                Some(if retry_after.subsec_nanos() > 0 { secs + 1 } else { secs })
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthenticated => write!(f, "unauthorized, please log in"),
            AuthError::Forbidden => {
                write!(f, "you are not permitted to perform this action")
            }
            AuthError::TooManyRequests { retry_after } => {
                let minutes = retry_after.as_secs().div_ceil(60).max(1);
                write!(f, "Too many login attempts. Try again in {minutes} minute(s).")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after_secs();
        let body = Json(AuthErrorBody {
            success: false,
            message: self.to_string(),
        });
        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn unauthenticated_returns_401_with_generic_message() {
        let response = AuthError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "unauthorized, please log in");
    }

    #[tokio::test]
    async fn forbidden_returns_403() {
        let response = AuthError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn throttled_sets_retry_after_and_minutes() {
        let err = AuthError::TooManyRequests {
            retry_after: Duration::from_secs(61),
        };
        assert_eq!(
            err.to_string(),
            "Too many login attempts. Try again in 2 minute(s)."
        );

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "61");
    }

    #[test]
    fn retry_after_rounds_up_partial_seconds() {
        let err = AuthError::TooManyRequests {
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(err.retry_after_secs(), Some(2));
    }
}
