// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal records shared by every credential store backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{password::SecretHash, Role};

/// The three account kinds. Each kind has its own credential namespace:
/// the same email may exist once per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalKind {
    #[serde(rename = "user")]
    EndUser,
    #[serde(rename = "propertyProvider")]
    PropertyProvider,
    #[serde(rename = "admin")]
    Administrator,
}

impl PrincipalKind {
    pub const ALL: [PrincipalKind; 3] = [
        PrincipalKind::EndUser,
        PrincipalKind::PropertyProvider,
        PrincipalKind::Administrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::EndUser => "user",
            PrincipalKind::PropertyProvider => "propertyProvider",
            PrincipalKind::Administrator => "admin",
        }
    }

    /// The role every record of this kind carries.
    pub fn role(&self) -> Role {
        match self {
            PrincipalKind::EndUser => Role::User,
            PrincipalKind::PropertyProvider => Role::PropertyProvider,
            PrincipalKind::Administrator => Role::Admin,
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pending code slot an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    EmailVerification,
    PasswordReset,
}

/// A one-time code waiting to be consumed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingCode {
    /// A code is accepted strictly before its expiry instant.
    pub fn accepts(&self, supplied: &str, now: DateTime<Utc>) -> bool {
        now < self.expires_at && constant_time_eq(self.code.as_bytes(), supplied.trim().as_bytes())
    }
}

impl fmt::Debug for PendingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCode")
            .field("code", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// What a successfully consumed code does to its record.
#[derive(Debug, Clone)]
pub enum CodeEffect {
    MarkEmailVerified,
    ReplaceSecret(SecretHash),
}

impl CodeEffect {
    pub fn purpose(&self) -> CodePurpose {
        match self {
            CodeEffect::MarkEmailVerified => CodePurpose::EmailVerification,
            CodeEffect::ReplaceSecret(_) => CodePurpose::PasswordReset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanInfo {
    pub reason: String,
    pub banned_at: DateTime<Utc>,
    pub banned_by: Uuid,
}

/// Kind-qualified reference to a principal (followers, likers, reporters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalRef {
    pub id: Uuid,
    pub kind: PrincipalKind,
}

/// Validated input for a new principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: String,
}

/// Validated profile changes. `None` leaves the field as it is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_photo: Option<String>,
    pub secret_hash: Option<SecretHash>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.profile_photo.is_none()
            && self.secret_hash.is_none()
    }
}

/// Stored principal of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub role: Role,
    pub username: String,
    /// Always stored normalized.
    pub email: String,
    pub secret_hash: SecretHash,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub country: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_photo: Option<String>,
    pub is_email_verified: bool,
    #[serde(default)]
    pub email_code: Option<PendingCode>,
    #[serde(default)]
    pub reset_code: Option<PendingCode>,
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub followers: Vec<PrincipalRef>,
    #[serde(default)]
    pub ban: Option<BanInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrincipalRecord {
    pub fn new(
        kind: PrincipalKind,
        input: NewPrincipal,
        secret_hash: SecretHash,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            role: kind.role(),
            username: input.username.trim().to_string(),
            email: normalize_email(&input.email),
            secret_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            country: input.country,
            bio: None,
            profile_photo: None,
            is_email_verified: false,
            email_code: None,
            reset_code: None,
            is_deleted: false,
            deleted_at: None,
            followers: Vec::new(),
            ban: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_banned(&self) -> bool {
        self.ban.is_some()
    }

    pub fn pending_code(&self, purpose: CodePurpose) -> Option<&PendingCode> {
        match purpose {
            CodePurpose::EmailVerification => self.email_code.as_ref(),
            CodePurpose::PasswordReset => self.reset_code.as_ref(),
        }
    }

    pub fn store_code(&mut self, purpose: CodePurpose, code: PendingCode, now: DateTime<Utc>) {
        match purpose {
            CodePurpose::EmailVerification => self.email_code = Some(code),
            CodePurpose::PasswordReset => self.reset_code = Some(code),
        }
        self.updated_at = now;
    }

    /// Check `supplied` against the pending code and apply `effect` if it
    /// matches. Deleted records never accept a code.
    pub fn consume_code(&mut self, supplied: &str, now: DateTime<Utc>, effect: CodeEffect) -> bool {
        if self.is_deleted {
            return false;
        }
        let slot = match effect.purpose() {
            CodePurpose::EmailVerification => &mut self.email_code,
            CodePurpose::PasswordReset => &mut self.reset_code,
        };
        if !slot.as_ref().is_some_and(|pending| pending.accepts(supplied, now)) {
            return false;
        }
        *slot = None;
        match effect {
            CodeEffect::MarkEmailVerified => self.is_email_verified = true,
            CodeEffect::ReplaceSecret(hash) => self.secret_hash = hash,
        }
        self.updated_at = now;
        true
    }

    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        if !self.is_deleted {
            self.is_deleted = true;
            self.deleted_at = Some(at);
            self.updated_at = at;
        }
    }

    pub fn apply_update(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(first_name) = update.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        if let Some(photo) = update.profile_photo {
            self.profile_photo = Some(photo);
        }
        if let Some(hash) = update.secret_hash {
            self.secret_hash = hash;
        }
        self.updated_at = now;
    }

    /// Returns `true` when the follower is present afterwards.
    pub fn toggle_follower(&mut self, follower: PrincipalRef) -> bool {
        if let Some(pos) = self.followers.iter().position(|f| *f == follower) {
            self.followers.remove(pos);
            false
        } else {
            self.followers.push(follower);
            true
        }
    }
}

/// Canonical form used for every email comparison and lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn record(kind: PrincipalKind, username: &str, email: &str) -> PrincipalRecord {
        PrincipalRecord::new(
            kind,
            NewPrincipal {
                username: username.to_string(),
                email: email.to_string(),
                first_name: None,
                last_name: None,
                country: "Nigeria".to_string(),
            },
            SecretHash::from_phc("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"),
            Utc::now(),
        )
    }
}
