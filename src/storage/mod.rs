// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistence for principals and listings.
//!
//! ## Backends
//!
//! | Backend | Type | When |
//! |---------|------|------|
//! | In-memory | [`MemoryCredentialStore`] | `DATA_DIR` unset, tests |
//! | redb | [`RedbCredentialStore`] | `DATA_DIR` set |
//!
//! Listings and notifications are served from memory. When `DATA_DIR` is
//! set they also write through to their own tables in the same redb file
//! (see [`mirror::TableMirror`]).
//!
//! Both credential backends implement [`CredentialStore`]. Every mutation that
//! depends on current record state (code consumption, follow toggles,
//! bans) runs as a single read-modify-write under one lock or one write
//! transaction, so concurrent callers never both observe the same code as
//! valid.

pub mod listings;
pub mod memory;
pub mod mirror;
pub mod notifications;
pub mod principals;
pub mod redb_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use listings::{
    ListingChanges, ListingFilter, ListingPage, ListingRecord, ListingReport, ListingStore,
    ReportReason,
};
pub use notifications::{NotificationKind, NotificationRecord, NotificationStore};
pub use memory::MemoryCredentialStore;
pub use principals::{
    BanInfo, CodeEffect, CodePurpose, PrincipalRef, NewPrincipal, PendingCode, PrincipalKind,
    PrincipalRecord, ProfileUpdate,
};
pub use redb_store::RedbCredentialStore;

/// Errors raised by the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{kind} with this {field} already exists")]
    Conflict {
        kind: PrincipalKind,
        field: &'static str,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Backend(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage task failed: {0}")]
    Task(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Credential store for all three principal kinds.
///
/// Lookups by email expect the caller to pass an already-normalized
/// address (see [`principals::normalize_email`]); implementations do not
/// re-normalize.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new principal. Fails with [`StorageError::Conflict`] when the
    /// email or username is already taken within the same kind.
    async fn insert(&self, record: PrincipalRecord) -> StorageResult<PrincipalRecord>;

    async fn get(&self, kind: PrincipalKind, id: Uuid) -> StorageResult<Option<PrincipalRecord>>;

    async fn find_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> StorageResult<Option<PrincipalRecord>>;

    /// All records of a kind, oldest first.
    async fn list(&self, kind: PrincipalKind) -> StorageResult<Vec<PrincipalRecord>>;

    /// Replace the pending code for `purpose`, invalidating any previous one.
    async fn set_code(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        purpose: CodePurpose,
        code: PendingCode,
    ) -> StorageResult<()>;

    /// Atomically check and consume a pending code.
    ///
    /// Returns `Ok(None)` when no live record matches `email`, or when the
    /// stored code is absent, different or expired at `now`. On success the
    /// code is cleared and `effect` is applied in the same step.
    async fn consume_code(
        &self,
        kind: PrincipalKind,
        email: &str,
        supplied: &str,
        now: DateTime<Utc>,
        effect: CodeEffect,
    ) -> StorageResult<Option<PrincipalRecord>>;

    /// Mark a record deleted. Idempotent; returns the updated record.
    async fn soft_delete(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StorageResult<PrincipalRecord>;

    /// Apply profile changes to a live record.
    ///
    /// A new username that another record of the same kind already holds
    /// is a [`StorageError::Conflict`]. Missing or deleted records are
    /// [`StorageError::NotFound`].
    async fn update_profile(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        update: ProfileUpdate,
    ) -> StorageResult<PrincipalRecord>;

    /// Set or clear the ban on a property provider.
    async fn set_ban(&self, id: Uuid, ban: Option<BanInfo>) -> StorageResult<PrincipalRecord>;

    /// Add `follower` to a provider's followers, or remove it if present.
    /// Returns `true` when the follower is present afterwards.
    async fn toggle_follower(&self, provider_id: Uuid, follower: PrincipalRef)
        -> StorageResult<bool>;
}
