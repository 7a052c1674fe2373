// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Write-through redb table for stores that serve reads from memory.
//!
//! Each entry is `uuid` → JSON. The owning store loads every entry once at
//! startup and then calls [`TableMirror::put`] or [`TableMirror::delete`]
//! before it changes its in-memory copy, so a failed write leaves both
//! sides as they were.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::{StorageError, StorageResult};

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

#[derive(Clone)]
pub struct TableMirror {
    db: Arc<Database>,
    table: JsonTable,
}

async fn blocking<T, F>(db: &Arc<Database>, op: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> StorageResult<T> + Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || op(db.as_ref()))
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}

impl TableMirror {
    /// Create the table if it does not exist yet.
    pub fn open(db: Arc<Database>, name: &'static str) -> StorageResult<Self> {
        let table: JsonTable = TableDefinition::new(name);
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(table)?;
        }
        write_txn.commit()?;
        Ok(Self { db, table })
    }

    pub async fn load_all<T>(&self) -> StorageResult<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let table = self.table;
        blocking(&self.db, move |db| {
            let read_txn = db.begin_read()?;
            let entries = read_txn.open_table(table)?;
            let mut out = Vec::new();
            for entry in entries.iter()? {
                let (_, value) = entry?;
                out.push(serde_json::from_slice(value.value())?);
            }
            Ok(out)
        })
        .await
    }

    pub async fn put<T: Serialize>(&self, id: Uuid, value: &T) -> StorageResult<()> {
        let json = serde_json::to_vec(value)?;
        let table = self.table;
        blocking(&self.db, move |db| {
            let key = id.to_string();
            let write_txn = db.begin_write()?;
            {
                let mut entries = write_txn.open_table(table)?;
                entries.insert(key.as_str(), json.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn delete(&self, id: Uuid) -> StorageResult<()> {
        let table = self.table;
        blocking(&self.db, move |db| {
            let key = id.to_string();
            let write_txn = db.begin_write()?;
            {
                let mut entries = write_txn.open_table(table)?;
                entries.remove(key.as_str())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }
}
