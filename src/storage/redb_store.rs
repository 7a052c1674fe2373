// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable credential store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `principals`: `kind:id` → serialized PrincipalRecord
//! - `principal_emails`: `kind:email` → id
//! - `principal_usernames`: `kind:username` → id
//!
//! `listings` and `notifications` live in the same file and are owned by
//! their stores (see [`super::mirror`]).
//!
//! redb calls are blocking, so every operation runs on the blocking pool.
//! Conditional updates (code consumption, follower toggles) read and write
//! inside a single write transaction; redb serializes writers, so two
//! consumers of the same code cannot both succeed.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use uuid::Uuid;

use super::{
    BanInfo, CodeEffect, CodePurpose, CredentialStore, PrincipalRef, PendingCode, PrincipalKind,
    PrincipalRecord, ProfileUpdate, StorageError, StorageResult,
};

// =============================================================================
// Table Definitions
// =============================================================================

const PRINCIPALS: TableDefinition<&str, &[u8]> = TableDefinition::new("principals");

const EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("principal_emails");

const USERNAME_INDEX: TableDefinition<&str, &str> = TableDefinition::new("principal_usernames");

fn record_key(kind: PrincipalKind, id: Uuid) -> String {
    format!("{}:{}", kind.as_str(), id)
}

fn index_key(kind: PrincipalKind, value: &str) -> String {
    format!("{}:{}", kind.as_str(), value)
}

// =============================================================================
// Store
// =============================================================================

#[derive(Clone)]
pub struct RedbCredentialStore {
    db: Arc<Database>,
}

impl RedbCredentialStore {
    /// Open (or create) the database file and make sure all tables exist.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRINCIPALS)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(USERNAME_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Shared handle for the other tables kept in the same file.
    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    async fn blocking<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StorageResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(db.as_ref()))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Load, mutate and write back one record inside `write_txn`.
    fn mutate_in<T>(
        write_txn: &WriteTransaction,
        kind: PrincipalKind,
        id: Uuid,
        f: impl FnOnce(&mut PrincipalRecord) -> T,
    ) -> StorageResult<Option<(PrincipalRecord, T)>> {
        let key = record_key(kind, id);
        let mut table = write_txn.open_table(PRINCIPALS)?;
        let mut record: PrincipalRecord = {
            let found = table.get(key.as_str())?;
            match found {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Ok(None),
            }
        };
        let out = f(&mut record);
        let json = serde_json::to_vec(&record)?;
        table.insert(key.as_str(), json.as_slice())?;
        Ok(Some((record, out)))
    }

    async fn mutate<T, F>(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        f: F,
    ) -> StorageResult<(PrincipalRecord, T)>
    where
        T: Send + 'static,
        F: FnOnce(&mut PrincipalRecord) -> T + Send + 'static,
    {
        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            let result = Self::mutate_in(&write_txn, kind, id, f)?;
            match result {
                Some(updated) => {
                    write_txn.commit()?;
                    Ok(updated)
                }
                None => {
                    write_txn.abort()?;
                    Err(StorageError::NotFound(kind.to_string()))
                }
            }
        })
        .await
    }
}

fn load(db: &Database, key: &str) -> StorageResult<Option<PrincipalRecord>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(PRINCIPALS)?;
    let found = table.get(key)?;
    let record = match found {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(record)
}

#[async_trait]
impl CredentialStore for RedbCredentialStore {
    async fn insert(&self, record: PrincipalRecord) -> StorageResult<PrincipalRecord> {
        self.blocking(move |db| {
            let id = record.id.to_string();
            let email_key = index_key(record.kind, &record.email);
            let username_key = index_key(record.kind, &record.username);
            let json = serde_json::to_vec(&record)?;

            let write_txn = db.begin_write()?;
            {
                let mut emails = write_txn.open_table(EMAIL_INDEX)?;
                if emails.get(email_key.as_str())?.is_some() {
                    return Err(StorageError::Conflict {
                        kind: record.kind,
                        field: "email",
                    });
                }
                let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
                if usernames.get(username_key.as_str())?.is_some() {
                    return Err(StorageError::Conflict {
                        kind: record.kind,
                        field: "username",
                    });
                }
                emails.insert(email_key.as_str(), id.as_str())?;
                usernames.insert(username_key.as_str(), id.as_str())?;

                let mut principals = write_txn.open_table(PRINCIPALS)?;
                let key = record_key(record.kind, record.id);
                principals.insert(key.as_str(), json.as_slice())?;
            }
            write_txn.commit()?;
            Ok(record)
        })
        .await
    }

    async fn get(&self, kind: PrincipalKind, id: Uuid) -> StorageResult<Option<PrincipalRecord>> {
        self.blocking(move |db| load(db, &record_key(kind, id)))
            .await
    }

    async fn find_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> StorageResult<Option<PrincipalRecord>> {
        let email_key = index_key(kind, email);
        self.blocking(move |db| {
            let id = {
                let read_txn = db.begin_read()?;
                let emails = read_txn.open_table(EMAIL_INDEX)?;
                let found = emails.get(email_key.as_str())?;
                let Some(value) = found else {
                    return Ok(None);
                };
                value.value().to_string()
            };
            load(db, &format!("{}:{}", kind.as_str(), id))
        })
        .await
    }

    async fn list(&self, kind: PrincipalKind) -> StorageResult<Vec<PrincipalRecord>> {
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(PRINCIPALS)?;

            // ';' sorts directly after ':' so this covers exactly one kind.
            let start = format!("{}:", kind.as_str());
            let end = format!("{};", kind.as_str());

            let mut out = Vec::new();
            for entry in table.range(start.as_str()..end.as_str())? {
                let entry = entry?;
                let record: PrincipalRecord = serde_json::from_slice(entry.1.value())?;
                out.push(record);
            }
            out.sort_by_key(|r| r.created_at);
            Ok(out)
        })
        .await
    }

    async fn set_code(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        purpose: CodePurpose,
        code: PendingCode,
    ) -> StorageResult<()> {
        let now = Utc::now();
        self.mutate(kind, id, move |r| r.store_code(purpose, code, now))
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
        let email_key = index_key(kind, email);
        let supplied = supplied.to_string();
        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            let id = {
                let emails = write_txn.open_table(EMAIL_INDEX)?;
                let found = emails.get(email_key.as_str())?;
                let parsed = found.map(|v| Uuid::parse_str(v.value()));
                let Some(Ok(id)) = parsed else {
                    return Ok(None);
                };
                id
            };
            let outcome = Self::mutate_in(&write_txn, kind, id, |r| {
                r.consume_code(&supplied, now, effect)
            })?;
            match outcome {
                Some((record, true)) => {
                    write_txn.commit()?;
                    Ok(Some(record))
                }
                _ => {
                    write_txn.abort()?;
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn soft_delete(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StorageResult<PrincipalRecord> {
        self.mutate(kind, id, move |r| r.mark_deleted(at))
            .await
            .map(|(r, _)| r)
    }

    async fn update_profile(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        update: ProfileUpdate,
    ) -> StorageResult<PrincipalRecord> {
        let now = Utc::now();
        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            let key = record_key(kind, id);
            let current: Option<PrincipalRecord> = {
                let principals = write_txn.open_table(PRINCIPALS)?;
                let found = principals.get(key.as_str())?;
                match found {
                    Some(value) => Some(serde_json::from_slice(value.value())?),
                    None => None,
                }
            };
            let Some(current) = current.filter(|r| !r.is_deleted) else {
                return Err(StorageError::NotFound(kind.to_string()));
            };

            if let Some(username) = update.username.as_deref() {
                if username != current.username {
                    let new_key = index_key(kind, username);
                    let old_key = index_key(kind, &current.username);
                    let id_value = id.to_string();
                    let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
                    if usernames.get(new_key.as_str())?.is_some() {
                        return Err(StorageError::Conflict {
                            kind,
                            field: "username",
                        });
                    }
                    usernames.remove(old_key.as_str())?;
                    usernames.insert(new_key.as_str(), id_value.as_str())?;
                }
            }

            let outcome = Self::mutate_in(&write_txn, kind, id, move |r| r.apply_update(update, now))?;
            match outcome {
                Some((record, ())) => {
                    write_txn.commit()?;
                    Ok(record)
                }
                None => Err(StorageError::NotFound(kind.to_string())),
            }
        })
        .await
    }

    async fn set_ban(&self, id: Uuid, ban: Option<BanInfo>) -> StorageResult<PrincipalRecord> {
        let now = Utc::now();
        self.mutate(PrincipalKind::PropertyProvider, id, move |r| {
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
        self.mutate(PrincipalKind::PropertyProvider, provider_id, move |r| {
            r.toggle_follower(follower)
        })
        .await
        .map(|(_, following)| following)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::SecretHash;
    use crate::storage::principals::test_support::record;
    use chrono::Duration;

    fn temp_store() -> (RedbCredentialStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbCredentialStore::open(&dir.path().join("credentials.redb")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn insert_and_lookup_by_email() {
        let (store, _dir) = temp_store();
        let rec = store
            .insert(record(PrincipalKind::EndUser, "alice", "alice@example.com"))
            .await
            .unwrap();

        let found = store
            .find_by_email(PrincipalKind::EndUser, "alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, rec.id);

        let other_kind = store
            .find_by_email(PrincipalKind::PropertyProvider, "alice@example.com")
            .await
            .unwrap();
        assert!(other_kind.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_within_kind_conflicts() {
        let (store, _dir) = temp_store();
        store
            .insert(record(PrincipalKind::EndUser, "alice", "alice@example.com"))
            .await
            .unwrap();
        let err = store
            .insert(record(PrincipalKind::EndUser, "other", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { field: "email", .. }));
    }

    #[tokio::test]
    async fn list_only_returns_requested_kind() {
        let (store, _dir) = temp_store();
        store
            .insert(record(PrincipalKind::EndUser, "alice", "alice@example.com"))
            .await
            .unwrap();
        store
            .insert(record(PrincipalKind::PropertyProvider, "acme", "sales@acme.com"))
            .await
            .unwrap();

        let users = store.list(PrincipalKind::EndUser).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
    }

    #[tokio::test]
    async fn reset_code_replaces_secret_once() {
        let (store, _dir) = temp_store();
        let rec = store
            .insert(record(PrincipalKind::Administrator, "root", "root@example.com"))
            .await
            .unwrap();
        let now = Utc::now();
        store
            .set_code(
                PrincipalKind::Administrator,
                rec.id,
                CodePurpose::PasswordReset,
                PendingCode {
                    code: "24680".into(),
                    expires_at: now + Duration::minutes(10),
                },
            )
            .await
            .unwrap();

        let new_hash = SecretHash::from_phc("$argon2id$v=19$m=19456,t=2,p=1$bmV3$bmV3");
        let updated = store
            .consume_code(
                PrincipalKind::Administrator,
                "root@example.com",
                "24680",
                now,
                CodeEffect::ReplaceSecret(new_hash.clone()),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.secret_hash, new_hash);

        let replay = store
            .consume_code(
                PrincipalKind::Administrator,
                "root@example.com",
                "24680",
                now,
                CodeEffect::ReplaceSecret(new_hash),
            )
            .await
            .unwrap();
        assert!(replay.is_none());
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.redb");
        let id = {
            let store = RedbCredentialStore::open(&path).unwrap();
            store
                .insert(record(PrincipalKind::EndUser, "alice", "alice@example.com"))
                .await
                .unwrap()
                .id
        };

        let store = RedbCredentialStore::open(&path).unwrap();
        let found = store.get(PrincipalKind::EndUser, id).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn renamed_username_moves_its_index_entry() {
        let (store, _dir) = temp_store();
        let alice = store
            .insert(record(PrincipalKind::EndUser, "alice", "alice@example.com"))
            .await
            .unwrap();
        let rename = |name: &str| ProfileUpdate {
            username: Some(name.to_string()),
            ..ProfileUpdate::default()
        };

        let renamed = store
            .update_profile(PrincipalKind::EndUser, alice.id, rename("alicia"))
            .await
            .unwrap();
        assert_eq!(renamed.username, "alicia");

        // The old name is free again, the new one is taken.
        store
            .insert(record(PrincipalKind::EndUser, "alice", "other@example.com"))
            .await
            .unwrap();
        let err = store
            .insert(record(PrincipalKind::EndUser, "alicia", "third@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { field: "username", .. }));

        let err = store
            .update_profile(PrincipalKind::EndUser, alice.id, rename("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { field: "username", .. }));
    }

    #[tokio::test]
    async fn toggle_follower_on_missing_provider_is_not_found() {
        let (store, _dir) = temp_store();
        let err = store
            .toggle_follower(
                Uuid::new_v4(),
                PrincipalRef {
                    id: Uuid::new_v4(),
                    kind: PrincipalKind::EndUser,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
