// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization guards.
//!
//! Guards run after a principal has been resolved. Role checks are a plain
//! membership test; ownership checks pass for the owner or any admin.
//! Identifiers are compared in canonical form, so `{A1B2...}`,
//! `urn:uuid:a1b2...` and `a1b2...` all name the same principal.

use uuid::Uuid;

use super::{claims::ResolvedPrincipal, AuthError, Role};

/// Canonical form of an identifier for equality checks.
///
/// UUIDs in any accepted textual form map to lowercase hyphenated. Other
/// strings are trimmed and lowercased.
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match Uuid::parse_str(trimmed) {
        Ok(id) => id.hyphenated().to_string(),
        Err(_) => trimmed.to_lowercase(),
    }
}

/// Allow only principals whose role is in `allowed`.
pub fn require_role(principal: &ResolvedPrincipal, allowed: &[Role]) -> Result<(), AuthError> {
    if principal.role.is_one_of(allowed) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Whether `principal` is the owner named by `owner_id`.
pub fn is_self(principal: &ResolvedPrincipal, owner_id: &str) -> bool {
    principal.id_string() == normalize_id(owner_id)
}

/// Allow the owner or any admin.
pub fn require_self_or_admin(
    principal: &ResolvedPrincipal,
    owner_id: &str,
) -> Result<(), AuthError> {
    if principal.is_admin() || is_self(principal, owner_id) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// A resource with a single owning principal.
pub trait OwnedResource {
    fn owner_id(&self) -> Uuid;
}

/// Self-or-admin check for any [`OwnedResource`].
pub trait OwnershipEnforcer {
    fn verify_ownership(&self, principal: &ResolvedPrincipal) -> Result<(), AuthError>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, principal: &ResolvedPrincipal) -> Result<(), AuthError> {
        require_self_or_admin(principal, &self.owner_id().to_string())
    }
}

impl OwnedResource for crate::storage::ListingRecord {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl OwnedResource for crate::storage::PrincipalRecord {
    fn owner_id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{principals::test_support::record, PrincipalKind};

    fn principal(kind: PrincipalKind, name: &str) -> ResolvedPrincipal {
        ResolvedPrincipal::from_record(&record(kind, name, &format!("{name}@example.com")))
    }

    #[test]
    fn role_check_is_membership() {
        let provider = principal(PrincipalKind::PropertyProvider, "acme");
        assert!(require_role(&provider, &[Role::PropertyProvider]).is_ok());
        assert_eq!(
            require_role(&provider, &[Role::User, Role::Admin]),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn self_matches_across_uuid_spellings() {
        let user = principal(PrincipalKind::EndUser, "alice");
        let upper = user.id.simple().to_string().to_uppercase();
        let braced = format!("{{{}}}", user.id);
        let urn = user.id.urn().to_string();

        assert!(require_self_or_admin(&user, &upper).is_ok());
        assert!(require_self_or_admin(&user, &braced).is_ok());
        assert!(require_self_or_admin(&user, &format!("  {urn} ")).is_ok());
    }

    #[test]
    fn other_principal_is_forbidden_but_admin_passes() {
        let alice = principal(PrincipalKind::EndUser, "alice");
        let bob = principal(PrincipalKind::EndUser, "bob");
        let admin = principal(PrincipalKind::Administrator, "root");

        assert_eq!(
            require_self_or_admin(&alice, &bob.id.to_string()),
            Err(AuthError::Forbidden)
        );
        assert!(require_self_or_admin(&admin, &bob.id.to_string()).is_ok());
    }

    #[test]
    fn non_uuid_ids_compare_case_insensitively() {
        assert_eq!(normalize_id("  ABC-def "), "abc-def");
    }

    #[test]
    fn ownership_enforcer_on_records() {
        let rec = record(PrincipalKind::EndUser, "alice", "alice@example.com");
        let owner = ResolvedPrincipal::from_record(&rec);
        let stranger = principal(PrincipalKind::EndUser, "mallory");

        assert!(rec.verify_ownership(&owner).is_ok());
        assert!(rec.verify_ownership(&stranger).is_err());
    }
}
