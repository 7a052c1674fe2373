// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal resolution.
//!
//! Turns request credentials into a [`ResolvedPrincipal`]:
//!
//! 1. verify the token (signature, structure, expiry)
//! 2. check the token's kind against what the endpoint accepts
//! 3. load the record and check it is live (not deleted, not banned,
//!    email verified, role unchanged)
//!
//! Several candidate tokens may be present. For a single-kind endpoint the
//! first candidate that fully resolves wins. For dual endpoints every
//! candidate is tried as an end user first, then as a property provider.
//! Callers only ever see [`AuthError::Unauthenticated`].

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::{
    claims::ResolvedPrincipal,
    token::{TokenError, TokenService},
    AuthError,
};
use crate::storage::{CredentialStore, PrincipalKind, StorageError};

/// Which principals an endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// Any kind of live principal.
    Any,
    /// Exactly one kind.
    Kind(PrincipalKind),
    /// End user, falling back to property provider.
    UserOrProvider,
}

/// Why one candidate failed. Logged, never returned.
#[derive(Debug)]
enum Rejection {
    Token(TokenError),
    WrongKind(PrincipalKind),
    BadSubject,
    Missing,
    Deleted,
    Banned,
    Unverified,
    RoleChanged,
    Store(StorageError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Token(e) => write!(f, "{e}"),
            Rejection::WrongKind(kind) => write!(f, "token belongs to a {kind}"),
            Rejection::BadSubject => write!(f, "subject is not a valid id"),
            Rejection::Missing => write!(f, "principal no longer exists"),
            Rejection::Deleted => write!(f, "principal is deleted"),
            Rejection::Banned => write!(f, "principal is banned"),
            Rejection::Unverified => write!(f, "principal email is not verified"),
            Rejection::RoleChanged => write!(f, "token role does not match record"),
            Rejection::Store(e) => write!(f, "store lookup failed: {e}"),
        }
    }
}

pub struct PrincipalResolver<'a> {
    tokens: &'a TokenService,
    store: &'a dyn CredentialStore,
}

impl<'a> PrincipalResolver<'a> {
    pub fn new(tokens: &'a TokenService, store: &'a dyn CredentialStore) -> Self {
        Self { tokens, store }
    }

    pub async fn resolve(
        &self,
        candidates: &[String],
        accept: Accept,
    ) -> Result<ResolvedPrincipal, AuthError> {
        self.resolve_at(candidates, accept, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        candidates: &[String],
        accept: Accept,
        now: DateTime<Utc>,
    ) -> Result<ResolvedPrincipal, AuthError> {
        if candidates.is_empty() {
            debug!("no credential presented");
            return Err(AuthError::Unauthenticated);
        }

        let passes: &[Option<PrincipalKind>] = match accept {
            Accept::Any => &[None],
            Accept::Kind(PrincipalKind::EndUser) => &[Some(PrincipalKind::EndUser)],
            Accept::Kind(PrincipalKind::PropertyProvider) => {
                &[Some(PrincipalKind::PropertyProvider)]
            }
            Accept::Kind(PrincipalKind::Administrator) => &[Some(PrincipalKind::Administrator)],
            Accept::UserOrProvider => &[
                Some(PrincipalKind::EndUser),
                Some(PrincipalKind::PropertyProvider),
            ],
        };

        for wanted in passes {
            for token in candidates {
                match self.resolve_one(token, *wanted, now).await {
                    Ok(principal) => return Ok(principal),
                    Err(reason) => debug!(%reason, ?wanted, "credential rejected"),
                }
            }
        }
        Err(AuthError::Unauthenticated)
    }

    async fn resolve_one(
        &self,
        token: &str,
        wanted: Option<PrincipalKind>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedPrincipal, Rejection> {
        let claims = self.tokens.verify_at(token, now).map_err(Rejection::Token)?;
        let kind = claims.role.kind();
        if wanted.is_some_and(|w| w != kind) {
            return Err(Rejection::WrongKind(kind));
        }
        let id = Uuid::parse_str(&claims.sub).map_err(|_| Rejection::BadSubject)?;

        let record = self
            .store
            .get(kind, id)
            .await
            .map_err(Rejection::Store)?
            .ok_or(Rejection::Missing)?;

        if record.is_deleted {
            return Err(Rejection::Deleted);
        }
        if record.is_banned() {
            return Err(Rejection::Banned);
        }
        if !record.is_email_verified {
            return Err(Rejection::Unverified);
        }
        if record.role != claims.role {
            return Err(Rejection::RoleChanged);
        }
        Ok(ResolvedPrincipal::from_record(&record))
    }
}
