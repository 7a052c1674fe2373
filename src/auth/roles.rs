// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Roles carried by principals and tokens.

use serde::{Deserialize, Serialize};

use crate::storage::PrincipalKind;

/// Role tag of a principal.
///
/// ## Roles
///
/// - `User` - End user browsing, liking and reporting listings
/// - `PropertyProvider` - Publishes listings, can be followed and banned
/// - `Admin` - Platform administrator; passes every ownership check
///
/// A role is fixed when the principal is created and maps one-to-one onto
/// its [`PrincipalKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "propertyProvider")]
    PropertyProvider,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    /// Whether this role appears in `allowed`. There is no hierarchy; an
    /// admin only passes a role check that lists `Admin`.
    pub fn is_one_of(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }

    /// Account kind this role belongs to.
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Role::User => PrincipalKind::EndUser,
            Role::PropertyProvider => PrincipalKind::PropertyProvider,
            Role::Admin => PrincipalKind::Administrator,
        }
    }

    /// Parse role from its wire name.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "propertyProvider" => Some(Role::PropertyProvider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::PropertyProvider => write!(f, "propertyProvider"),
            Role::Admin => write!(f, "admin"),
        }
    }
}
