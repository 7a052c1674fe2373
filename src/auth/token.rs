// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session tokens.
//!
//! Expiry is checked here rather than by `jsonwebtoken` so the boundary is
//! exact (`now >= exp` is expired, no leeway) and so callers can supply
//! their own clock in tests.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::TokenClaims;
use crate::storage::PrincipalRecord;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, record: &PrincipalRecord) -> Result<IssuedToken, TokenError> {
        self.issue_at(record, Utc::now())
    }

    pub fn issue_at(
        &self,
        record: &PrincipalRecord,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        // `iat`/`exp` are whole seconds; keep `expires_at` on the same grid.
        let now = now
            .with_nanosecond(0)
            .ok_or_else(|| TokenError::Signing("clock out of range".into()))?;
        let expires_at = now + self.lifetime;
        let claims = TokenClaims {
            sub: record.id.to_string(),
            email: record.email.clone(),
            role: record.role,
            username: Some(record.username.clone()),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Check signature and structure, then expiry against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or_else(|| TokenError::Malformed("exp out of range".into()))?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}
