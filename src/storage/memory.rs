// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory credential store.
//!
//! Used when no data directory is configured and by the test suite.
//! Every mutation runs under the write lock, which gives the same
//! check-then-update atomicity the redb backend gets from a write
//! transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    BanInfo, CodeEffect, CodePurpose, CredentialStore, PrincipalRef, PendingCode, PrincipalKind,
    PrincipalRecord, ProfileUpdate, StorageError, StorageResult,
};

#[derive(Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<(PrincipalKind, Uuid), PrincipalRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<T>(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        f: impl FnOnce(&mut PrincipalRecord) -> T,
    ) -> StorageResult<(PrincipalRecord, T)> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&(kind, id))
            .ok_or_else(|| StorageError::NotFound(kind.to_string()))?;
        let out = f(record);
        Ok((record.clone(), out))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, record: PrincipalRecord) -> StorageResult<PrincipalRecord> {
        let mut records = self.records.write().await;
        for existing in records.values().filter(|r| r.kind == record.kind) {
            if existing.email == record.email {
                return Err(StorageError::Conflict {
                    kind: record.kind,
                    field: "email",
                });
            }
            if existing.username == record.username {
                return Err(StorageError::Conflict {
                    kind: record.kind,
                    field: "username",
                });
            }
        }
        records.insert((record.kind, record.id), record.clone());
        Ok(record)
    }

    async fn get(&self, kind: PrincipalKind, id: Uuid) -> StorageResult<Option<PrincipalRecord>> {
        Ok(self.records.read().await.get(&(kind, id)).cloned())
    }

    async fn find_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> StorageResult<Option<PrincipalRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.kind == kind && r.email == email)
            .cloned())
    }

    async fn list(&self, kind: PrincipalKind) -> StorageResult<Vec<PrincipalRecord>> {
        let records = self.records.read().await;
        let mut out: Vec<_> = records.values().filter(|r| r.kind == kind).cloned().collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    async fn set_code(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        purpose: CodePurpose,
        code: PendingCode,
    ) -> StorageResult<()> {
        let now = Utc::now();
        self.mutate(kind, id, |r| r.store_code(purpose, code, now))
            .await
            .map(|_| ())
    }

    async fn consume_code(
        &self,
        kind: PrincipalKind,
        email: &str,
        supplied: &str,
        now: DateTime<Utc>,
        effect: CodeEffect,
    ) -> StorageResult<Option<PrincipalRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records
            .values_mut()
            .find(|r| r.kind == kind && r.email == email)
        else {
            return Ok(None);
        };
        if record.consume_code(supplied, now, effect) {
            Ok(Some(record.clone()))
        } else {
            Ok(None)
        }
    }

    async fn soft_delete(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StorageResult<PrincipalRecord> {
        self.mutate(kind, id, |r| r.mark_deleted(at))
            .await
            .map(|(r, _)| r)
    }

    async fn update_profile(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        update: ProfileUpdate,
    ) -> StorageResult<PrincipalRecord> {
        let mut records = self.records.write().await;
        if let Some(username) = update.username.as_deref() {
            let taken = records
                .values()
                .any(|r| r.kind == kind && r.id != id && r.username == username);
            if taken {
                return Err(StorageError::Conflict {
                    kind,
                    field: "username",
                });
            }
        }
        let record = records
            .get_mut(&(kind, id))
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| StorageError::NotFound(kind.to_string()))?;
        record.apply_update(update, Utc::now());
        Ok(record.clone())
    }

    async fn set_ban(&self, id: Uuid, ban: Option<BanInfo>) -> StorageResult<PrincipalRecord> {
        let now = Utc::now();
        self.mutate(PrincipalKind::PropertyProvider, id, |r| {
            r.ban = ban;
            r.updated_at = now;
        })
        .await
        .map(|(r, _)| r)
    }

    async fn toggle_follower(
        &self,
        provider_id: Uuid,
        follower: PrincipalRef,
    ) -> StorageResult<bool> {
        self.mutate(PrincipalKind::PropertyProvider, provider_id, |r| {
            r.toggle_follower(follower)
        })
        .await
        .map(|(_, following)| following)
    }
}
