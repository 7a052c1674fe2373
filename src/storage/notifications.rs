// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-app notifications for end users and property providers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::Database;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{mirror::TableMirror, PrincipalRef, StorageError, StorageResult};

const NOTIFICATIONS_TABLE: &str = "notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ListingLiked,
    NewFollower,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient: PrincipalRef,
    pub sender: PrincipalRef,
    pub kind: NotificationKind,
    /// The liked listing, or the followed provider.
    pub entity_id: Uuid,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        recipient: PrincipalRef,
        sender: PrincipalRef,
        kind: NotificationKind,
        entity_id: Uuid,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            sender,
            kind,
            entity_id,
            message,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Default)]
pub struct NotificationStore {
    entries: RwLock<HashMap<Uuid, NotificationRecord>>,
    mirror: Option<TableMirror>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn persistent(db: Arc<Database>) -> StorageResult<Self> {
        let mirror = TableMirror::open(db, NOTIFICATIONS_TABLE)?;
        let loaded: Vec<NotificationRecord> = mirror.load_all().await?;
        debug!(count = loaded.len(), "notifications loaded");
        Ok(Self {
            entries: RwLock::new(loaded.into_iter().map(|n| (n.id, n)).collect()),
            mirror: Some(mirror),
        })
    }

    pub async fn push(&self, notification: NotificationRecord) -> StorageResult<NotificationRecord> {
        let mut entries = self.entries.write().await;
        if let Some(mirror) = &self.mirror {
            mirror.put(notification.id, &notification).await?;
        }
        entries.insert(notification.id, notification.clone());
        Ok(notification)
    }

    /// Everything addressed to `recipient`, newest first.
    pub async fn for_recipient(&self, recipient: PrincipalRef) -> Vec<NotificationRecord> {
        let entries = self.entries.read().await;
        let mut out: Vec<_> = entries
            .values()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }

    /// Mark one of `recipient`'s notifications read. Someone else's
    /// notification is reported as missing.
    pub async fn mark_read(
        &self,
        id: Uuid,
        recipient: PrincipalRef,
    ) -> StorageResult<NotificationRecord> {
        let mut entries = self.entries.write().await;
        let mut next = entries
            .get(&id)
            .filter(|n| n.recipient == recipient)
            .cloned()
            .ok_or_else(|| StorageError::NotFound("notification".into()))?;
        if next.is_read {
            return Ok(next);
        }
        next.is_read = true;
        if let Some(mirror) = &self.mirror {
            mirror.put(id, &next).await?;
        }
        entries.insert(id, next.clone());
        Ok(next)
    }
}
