// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Listing endpoints.
//!
//! Creation and updates are for property providers; likes and reports
//! accept either an end user or a property provider and are keyed by
//! `(id, kind)`. Reads are public.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ApiJson;
use crate::{
    auth::{
        guard::{normalize_id, OwnershipEnforcer},
        Auth, AuthError, ProviderAuth, UserOrProvider,
    },
    error::ApiError,
    models::{
        ApiResponse, CreateListingRequest, LikeStatus, ListingPageView, ListingQuery,
        ListingView, MessageResponse, ReportReceipt, ReportRequest, UpdateListingRequest,
    },
    state::AppState,
    storage::{
        ListingChanges, ListingFilter, ListingRecord, ListingReport, NotificationKind,
        NotificationRecord, PrincipalKind, PrincipalRef, ReportReason,
    },
    validation::{Checks, FieldError},
};

const REASONS: &str = "scam, fake_photos, misleading_info, offensive_content, duplicate_listing, other";

const TITLE_LEN: (usize, usize) = (3, 120);
const DESCRIPTION_LEN: (usize, usize) = (10, 2000);
const LOCATION_LEN: (usize, usize) = (2, 120);
const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;
const PRICE_MESSAGE: &str = "\"price\" must be a positive number";

fn listing_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(&normalize_id(raw)).map_err(|_| ApiError::not_found("listing not found"))
}

async fn load(state: &AppState, id: Uuid) -> Result<ListingRecord, ApiError> {
    state
        .listings
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found("listing not found"))
}

#[utoipa::path(
    post,
    path = "/api/listings",
    request_body = CreateListingRequest,
    tag = "Listings",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 201, description = "Listing created", body = ApiResponse<ListingView>),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a property provider")
    )
)]
pub async fn create_listing(
    ProviderAuth(provider): ProviderAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateListingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ListingView>>), ApiError> {
    Checks::new()
        .length("title", &request.title, TITLE_LEN.0, TITLE_LEN.1)
        .length("description", &request.description, DESCRIPTION_LEN.0, DESCRIPTION_LEN.1)
        .length("location", &request.location, LOCATION_LEN.0, LOCATION_LEN.1)
        .check("price", request.price > 0, PRICE_MESSAGE)
        .finish()
        .map_err(ApiError::validation)?;

    let listing = state
        .listings
        .insert(ListingRecord::new(
            provider.id,
            request.title.trim().to_string(),
            request.description.trim().to_string(),
            request.location.trim().to_string(),
            request.price,
        ))
        .await?;
    info!(listing = %listing.id, owner = %provider.id, "listing created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "listing created successfully",
            ListingView::from(&listing),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    tag = "Listings",
    responses(
        (status = 200, description = "The listing", body = ApiResponse<ListingView>),
        (status = 404, description = "No such listing")
    )
)]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ListingView>>, ApiError> {
    let listing = load(&state, listing_id(&id)?).await?;
    Ok(Json(ApiResponse::with_data(
        "listing found successfully",
        ListingView::from(&listing),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    tag = "Listings",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Listing deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Neither the owner nor an admin"),
        (status = 404, description = "No such listing")
    )
)]
pub async fn delete_listing(
    Auth(principal): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let listing = load(&state, listing_id(&id)?).await?;
    listing.verify_ownership(&principal)?;

    state.listings.remove(listing.id).await?;
    info!(listing = %listing.id, by = %principal.id, "listing deleted");
    Ok(Json(MessageResponse::new("listing deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/listings/{id}/like",
    params(("id" = String, Path, description = "Listing id")),
    tag = "Listings",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Like toggled", body = ApiResponse<LikeStatus>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an end user or property provider"),
        (status = 404, description = "No such listing")
    )
)]
pub async fn toggle_like(
    UserOrProvider(caller): UserOrProvider,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LikeStatus>>, ApiError> {
    let id = listing_id(&id)?;
    let liker = caller.principal_ref();
    let (listing, liked) = state.listings.toggle_like(id, liker).await?;

    let owner = PrincipalRef {
        id: listing.owner_id,
        kind: PrincipalKind::PropertyProvider,
    };
    if liked && owner != liker {
        let note = NotificationRecord::new(
            owner,
            liker,
            NotificationKind::ListingLiked,
            listing.id,
            format!("{} liked your listing \"{}\"", caller.username, listing.title),
        );
        if let Err(e) = state.notifications.push(note).await {
            warn!(listing = %listing.id, error = %e, "like notification not stored");
        }
    }

    let message = if liked {
        "listing liked successfully"
    } else {
        "listing unliked successfully"
    };
    Ok(Json(ApiResponse::with_data(
        message,
        LikeStatus {
            liked,
            likes: listing.likes.len(),
        },
    )))
}

/// One report per listing per `(reporter id, kind)`. A provider cannot
/// report its own listing.
#[utoipa::path(
    post,
    path = "/api/listings/{id}/report",
    params(("id" = String, Path, description = "Listing id")),
    request_body = ReportRequest,
    tag = "Listings",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 201, description = "Report recorded", body = ApiResponse<ReportReceipt>),
        (status = 400, description = "Unknown reason"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an end user or property provider, or reporting your own listing"),
        (status = 404, description = "No such listing"),
        (status = 409, description = "Already reported")
    )
)]
pub async fn report_listing(
    UserOrProvider(caller): UserOrProvider,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReportReceipt>>), ApiError> {
    let reason: ReportReason = request.reason.trim().parse().map_err(|()| {
        ApiError::validation(vec![FieldError::new(
            "reason",
            format!("\"reason\" must be one of [{REASONS}]"),
        )])
    })?;

    let listing = load(&state, listing_id(&id)?).await?;
    if caller.kind == PrincipalKind::PropertyProvider && caller.id == listing.owner_id {
        warn!(listing = %listing.id, "provider tried to report own listing");
        return Err(AuthError::Forbidden.into());
    }

    let report = state
        .listings
        .add_report(
            listing.id,
            ListingReport {
                id: Uuid::new_v4(),
                reporter: caller.principal_ref(),
                reason,
                description: request
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty()),
                created_at: Utc::now(),
            },
        )
        .await?;
    info!(listing = %listing.id, reporter = %caller.id, kind = %caller.kind, ?reason, "listing reported");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "listing reported successfully",
            ReportReceipt {
                id: report.id,
                listing_id: listing.id,
                reason,
            },
        )),
    ))
}

#[utoipa::path(
    put,
    path = "/api/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    request_body = UpdateListingRequest,
    tag = "Listings",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Listing updated", body = ApiResponse<ListingView>),
        (status = 400, description = "Invalid fields, or nothing to update"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the provider that owns the listing"),
        (status = 404, description = "No such listing")
    )
)]
pub async fn update_listing(
    ProviderAuth(provider): ProviderAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateListingRequest>,
) -> Result<Json<ApiResponse<ListingView>>, ApiError> {
    let listing = load(&state, listing_id(&id)?).await?;
    if listing.owner_id != provider.id {
        warn!(listing = %listing.id, by = %provider.id, "update of another provider's listing");
        return Err(AuthError::Forbidden.into());
    }

    let mut checks = Checks::new();
    if let Some(title) = &request.title {
        checks.length("title", title, TITLE_LEN.0, TITLE_LEN.1);
    }
    if let Some(description) = &request.description {
        checks.length("description", description, DESCRIPTION_LEN.0, DESCRIPTION_LEN.1);
    }
    if let Some(location) = &request.location {
        checks.length("location", location, LOCATION_LEN.0, LOCATION_LEN.1);
    }
    if let Some(price) = request.price {
        checks.check("price", price > 0, PRICE_MESSAGE);
    }
    checks.finish().map_err(ApiError::validation)?;

    let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());
    let changes = ListingChanges {
        title: trimmed(request.title),
        description: trimmed(request.description),
        location: trimmed(request.location),
        price: request.price,
    };
    if changes.is_empty() {
        return Err(ApiError::bad_request("No valid fields provided for update"));
    }

    let updated = state.listings.update(listing.id, changes).await?;
    info!(listing = %updated.id, owner = %provider.id, "listing updated");
    Ok(Json(ApiResponse::with_data(
        "listing updated successfully",
        ListingView::from(&updated),
    )))
}

fn page_bounds(query: &ListingQuery) -> (usize, usize) {
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let limit = query
        .limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    (page, limit)
}

/// Every listing, newest first.
#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingQuery),
    tag = "Listings",
    responses(
        (status = 200, description = "One page of listings", body = ApiResponse<ListingPageView>)
    )
)]
pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Json<ApiResponse<ListingPageView>> {
    let (page, limit) = page_bounds(&query);
    let filter = ListingFilter {
        owner: None,
        location: query.location.filter(|l| !l.trim().is_empty()),
    };
    let found = state.listings.page(&filter, page, limit).await;
    Json(ApiResponse::with_data(
        "listings retrieved successfully",
        ListingPageView::new(found, page, limit),
    ))
}

/// The signed-in provider's own listings, newest first.
#[utoipa::path(
    get,
    path = "/api/listings/mine",
    params(ListingQuery),
    tag = "Listings",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of the provider's listings", body = ApiResponse<ListingPageView>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a property provider")
    )
)]
pub async fn list_mine(
    ProviderAuth(provider): ProviderAuth,
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Json<ApiResponse<ListingPageView>> {
    let (page, limit) = page_bounds(&query);
    let filter = ListingFilter {
        owner: Some(provider.id),
        location: None,
    };
    let found = state.listings.page(&filter, page, limit).await;
    Json(ApiResponse::with_data(
        "your listings retrieved successfully",
        ListingPageView::new(found, page, limit),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_default_and_clamp() {
        let query = |page, limit| ListingQuery {
            page,
            limit,
            location: None,
        };
        assert_eq!(page_bounds(&query(None, None)), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_bounds(&query(Some(0), Some(0))), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_bounds(&query(Some(3), Some(500))), (3, MAX_PAGE_SIZE));
    }
}
