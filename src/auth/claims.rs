// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the resolved principal handed to handlers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::roles::Role;
use crate::storage::{PrincipalKind, PrincipalRecord, PrincipalRef};

/// Claims signed into every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds). The token is invalid from this instant on.
    pub exp: i64,
}

/// A principal whose token verified and whose record is live.
///
/// Built only by the resolver, after the record was loaded and checked for
/// deletion, ban and email verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrincipal {
    pub kind: PrincipalKind,
    pub id: Uuid,
    pub role: Role,
    pub email: String,
    pub username: String,
}

impl ResolvedPrincipal {
    pub fn from_record(record: &PrincipalRecord) -> Self {
        Self {
            kind: record.kind,
            id: record.id,
            role: record.role,
            email: record.email.clone(),
            username: record.username.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Canonical string form of the id, used for ownership comparison.
    pub fn id_string(&self) -> String {
        self.id.hyphenated().to_string()
    }

    pub fn principal_ref(&self) -> PrincipalRef {
        PrincipalRef {
            id: self.id,
            kind: self.kind,
        }
    }
}
