// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Field names follow the
//! public JSON contract (`otp`, `newPassword`, `expiresAt`), so most types
//! rename to camelCase.
//!
//! Success bodies share the envelope [`ApiResponse`]:
//! `{"success": true, "message": ..., "data"?: ...}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    auth::Role,
    storage::{
        BanInfo, ListingPage, ListingRecord, NotificationKind, NotificationRecord, PrincipalKind,
        PrincipalRecord, PrincipalRef, ReportReason,
    },
    verification::IssuedCode,
};

pub const DEFAULT_COUNTRY: &str = "Nigeria";

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Success envelope without a payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// =============================================================================
// Account Requests
// =============================================================================

/// Registration body for every kind. Name fields are only required for
/// property providers; admins ignore them.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub new_password: String,
}

/// Partial profile update. At least one field must be present. Names and
/// `bio` are only accepted for property providers.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BanRequest {
    #[serde(default)]
    pub reason: String,
}

// =============================================================================
// Listing Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub price: u64,
}

/// Partial listing update. At least one field must be present.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateListingRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
}

/// Paging for listing reads.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingQuery {
    /// Page number, starting at 1 (default: 1)
    #[param(default = 1)]
    pub page: Option<usize>,
    /// Page size (default: 20, max: 100)
    #[param(default = 20)]
    pub limit: Option<usize>,
    /// Exact location, case-insensitive. Ignored for a provider's own listings.
    pub location: Option<String>,
}

/// `reason` stays a string so an unknown value is a 400 with a field
/// error rather than a body rejection.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReportRequest {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// Where a fresh code went and when it stops working.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedCode> for PendingVerification {
    fn from(issued: IssuedCode) -> Self {
        Self {
            email: issued.email,
            expires_at: issued.expires_at,
        }
    }
}

/// Public view of a principal. Never carries the secret hash or codes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalView {
    pub id: Uuid,
    #[schema(value_type = String, example = "propertyProvider")]
    pub kind: PrincipalKind,
    #[schema(value_type = String, example = "propertyProvider")]
    pub role: Role,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    pub is_email_verified: bool,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub ban: Option<BanInfo>,
    pub created_at: DateTime<Utc>,
}

impl From<&PrincipalRecord> for PrincipalView {
    fn from(record: &PrincipalRecord) -> Self {
        let is_provider = record.kind == PrincipalKind::PropertyProvider;
        Self {
            id: record.id,
            kind: record.kind,
            role: record.role,
            username: record.username.clone(),
            email: record.email.clone(),
            firstname: record.first_name.clone(),
            lastname: record.last_name.clone(),
            country: record.country.clone(),
            bio: record.bio.clone(),
            profile_photo: record.profile_photo.clone(),
            is_email_verified: record.is_email_verified,
            is_deleted: record.is_deleted,
            followers: is_provider.then_some(record.followers.len()),
            ban: record.ban.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub user: PrincipalView,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatus {
    pub following: bool,
    pub followers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: u64,
    pub likes: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ListingRecord> for ListingView {
    fn from(listing: &ListingRecord) -> Self {
        Self {
            id: listing.id,
            owner_id: listing.owner_id,
            title: listing.title.clone(),
            description: listing.description.clone(),
            location: listing.location.clone(),
            price: listing.price,
            likes: listing.likes.len(),
            created_at: listing.created_at,
            updated_at: listing.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingPageView {
    pub listings: Vec<ListingView>,
    pub pagination: Pagination,
}

impl ListingPageView {
    pub fn new(page: ListingPage, number: usize, limit: usize) -> Self {
        Self {
            listings: page.listings.iter().map(ListingView::from).collect(),
            pagination: Pagination {
                page: number,
                limit,
                total: page.total,
                total_pages: page.total.div_ceil(limit.max(1)),
            },
        }
    }
}

/// Who sent or received a notification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrincipalRefView {
    pub id: Uuid,
    #[schema(value_type = String, example = "user")]
    pub kind: PrincipalKind,
}

impl From<PrincipalRef> for PrincipalRefView {
    fn from(principal: PrincipalRef) -> Self {
        Self {
            id: principal.id,
            kind: principal.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "LISTING_LIKED")]
    pub kind: NotificationKind,
    pub sender: PrincipalRefView,
    pub entity_id: Uuid,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&NotificationRecord> for NotificationView {
    fn from(note: &NotificationRecord) -> Self {
        Self {
            id: note.id,
            kind: note.kind,
            sender: note.sender.into(),
            entity_id: note.entity_id,
            message: note.message.clone(),
            is_read: note.is_read,
            created_at: note.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    pub likes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub id: Uuid,
    pub listing_id: Uuid,
    #[schema(value_type = String, example = "scam")]
    pub reason: ReportReason,
}
