// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Listing repository.
//!
//! Likes and reports are keyed by [`PrincipalRef`], so an end user and a
//! property provider that share an id value still count as two distinct
//! actors.
//!
//! With a data directory configured the store writes through to the
//! `listings` table of the credentials database.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::Database;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{mirror::TableMirror, PrincipalRef, StorageError, StorageResult};

const LISTINGS_TABLE: &str = "listings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Scam,
    FakePhotos,
    MisleadingInfo,
    OffensiveContent,
    DuplicateListing,
    Other,
}

impl FromStr for ReportReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scam" => Ok(ReportReason::Scam),
            "fake_photos" => Ok(ReportReason::FakePhotos),
            "misleading_info" => Ok(ReportReason::MisleadingInfo),
            "offensive_content" => Ok(ReportReason::OffensiveContent),
            "duplicate_listing" => Ok(ReportReason::DuplicateListing),
            "other" => Ok(ReportReason::Other),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingReport {
    pub id: Uuid,
    pub reporter: PrincipalRef,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: Uuid,
    /// Property provider that created the listing.
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: u64,
    pub likes: Vec<PrincipalRef>,
    #[serde(default)]
    pub reports: Vec<ListingReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListingRecord {
    pub fn new(owner_id: Uuid, title: String, description: String, location: String, price: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            description,
            location,
            price,
            likes: Vec::new(),
            reports: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial listing update. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price: Option<u64>,
}

impl ListingChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.price.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub owner: Option<Uuid>,
    /// Case-insensitive exact match on the trimmed location.
    pub location: Option<String>,
}

impl ListingFilter {
    fn matches(&self, listing: &ListingRecord) -> bool {
        self.owner.is_none_or(|owner| listing.owner_id == owner)
            && self
                .location
                .as_deref()
                .is_none_or(|loc| listing.location.trim().eq_ignore_ascii_case(loc.trim()))
    }
}

/// One page of listings plus the number of matches across all pages.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub listings: Vec<ListingRecord>,
    pub total: usize,
}

/// Listings held in memory, optionally written through to a redb table.
#[derive(Default)]
pub struct ListingStore {
    listings: RwLock<HashMap<Uuid, ListingRecord>>,
    mirror: Option<TableMirror>,
}

fn not_found() -> StorageError {
    StorageError::NotFound("listing".into())
}

impl ListingStore {
    /// Memory only. Listings are lost on restart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every listing from the `listings` table of `db` and keep
    /// writing changes back to it.
    pub async fn persistent(db: Arc<Database>) -> StorageResult<Self> {
        let mirror = TableMirror::open(db, LISTINGS_TABLE)?;
        let loaded: Vec<ListingRecord> = mirror.load_all().await?;
        debug!(count = loaded.len(), "listings loaded");
        Ok(Self {
            listings: RwLock::new(loaded.into_iter().map(|l| (l.id, l)).collect()),
            mirror: Some(mirror),
        })
    }

    async fn persist(&self, listing: &ListingRecord) -> StorageResult<()> {
        match &self.mirror {
            Some(mirror) => mirror.put(listing.id, listing).await,
            None => Ok(()),
        }
    }

    /// Apply `f` to a copy, persist it, then swap it in.
    async fn modify<T, F>(&self, id: Uuid, f: F) -> StorageResult<(ListingRecord, T)>
    where
        T: Send,
        F: FnOnce(&mut ListingRecord) -> StorageResult<T> + Send,
    {
        let mut listings = self.listings.write().await;
        let mut next = listings.get(&id).cloned().ok_or_else(not_found)?;
        let out = f(&mut next)?;
        self.persist(&next).await?;
        listings.insert(id, next.clone());
        Ok((next, out))
    }

    pub async fn insert(&self, listing: ListingRecord) -> StorageResult<ListingRecord> {
        let mut listings = self.listings.write().await;
        self.persist(&listing).await?;
        listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    pub async fn get(&self, id: Uuid) -> Option<ListingRecord> {
        self.listings.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> StorageResult<ListingRecord> {
        let mut listings = self.listings.write().await;
        if !listings.contains_key(&id) {
            return Err(not_found());
        }
        if let Some(mirror) = &self.mirror {
            mirror.delete(id).await?;
        }
        listings.remove(&id).ok_or_else(not_found)
    }

    pub async fn update(&self, id: Uuid, changes: ListingChanges) -> StorageResult<ListingRecord> {
        self.modify(id, move |listing| {
            if let Some(title) = changes.title {
                listing.title = title;
            }
            if let Some(description) = changes.description {
                listing.description = description;
            }
            if let Some(location) = changes.location {
                listing.location = location;
            }
            if let Some(price) = changes.price {
                listing.price = price;
            }
            listing.updated_at = Utc::now();
            Ok(())
        })
        .await
        .map(|(listing, ())| listing)
    }

    /// Newest first. `page` starts at 1.
    pub async fn page(&self, filter: &ListingFilter, page: usize, limit: usize) -> ListingPage {
        let listings = self.listings.read().await;
        let mut matching: Vec<&ListingRecord> =
            listings.values().filter(|l| filter.matches(l)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let skip = page.saturating_sub(1).saturating_mul(limit);
        ListingPage {
            total: matching.len(),
            listings: matching.into_iter().skip(skip).take(limit).cloned().collect(),
        }
    }

    /// Flip `liker`'s like. Returns the listing and whether it is liked
    /// afterwards.
    pub async fn toggle_like(
        &self,
        id: Uuid,
        liker: PrincipalRef,
    ) -> StorageResult<(ListingRecord, bool)> {
        self.modify(id, move |listing| {
            let liked = match listing.likes.iter().position(|l| *l == liker) {
                Some(pos) => {
                    listing.likes.remove(pos);
                    false
                }
                None => {
                    listing.likes.push(liker);
                    true
                }
            };
            listing.updated_at = Utc::now();
            Ok(liked)
        })
        .await
    }

    /// Record a report. One report per listing per reporter.
    pub async fn add_report(&self, id: Uuid, report: ListingReport) -> StorageResult<ListingReport> {
        self.modify(id, move |listing| {
            if listing.reports.iter().any(|r| r.reporter == report.reporter) {
                return Err(StorageError::Duplicate(
                    "you have already reported this listing".into(),
                ));
            }
            listing.reports.push(report.clone());
            Ok(report)
        })
        .await
        .map(|(_, report)| report)
    }
}
