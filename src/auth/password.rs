// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argon2id secret hashing.
//!
//! Stores only ever see a [`SecretHash`]. Plaintext goes in through
//! [`hash_secret`] and nowhere else, so a hash cannot be hashed a second
//! time by a store write.

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use tokio::{sync::OnceCell, task};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash secret: {0}")]
    Hash(String),

    #[error("stored hash is malformed: {0}")]
    MalformedHash(String),

    #[error("hashing task failed: {0}")]
    Task(#[from] task::JoinError),
}

/// PHC-formatted Argon2id hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHash(String);

impl SecretHash {
    /// Wrap an existing PHC string (loaded from storage or fixtures).
    pub(crate) fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(<redacted>)")
    }
}

/// Hash a plaintext secret on the blocking pool.
pub async fn hash_secret(plaintext: &str) -> Result<SecretHash, PasswordError> {
    let plaintext = plaintext.to_string();
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| SecretHash(hash.to_string()))
            .map_err(|e| PasswordError::Hash(e.to_string()))
    })
    .await?
}

/// Check a plaintext secret against a stored hash on the blocking pool.
pub async fn verify_secret(plaintext: &str, hash: &SecretHash) -> Result<bool, PasswordError> {
    let plaintext = plaintext.to_string();
    let phc = hash.0.clone();
    task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&phc).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    })
    .await?
}

const DECOY_SECRET: &str = "decoy-secret-for-missing-accounts";

static DECOY_HASH: OnceCell<SecretHash> = OnceCell::const_new();

/// Run a full Argon2 verification against a fixed decoy hash.
///
/// Used when there is no account to check, so a miss costs the same as a
/// wrong password. Always answers `false`.
pub async fn verify_decoy(plaintext: &str) -> Result<bool, PasswordError> {
    let decoy = DECOY_HASH
        .get_or_try_init(|| hash_secret(DECOY_SECRET))
        .await?;
    verify_secret(plaintext, decoy).await?;
    Ok(false)
}
