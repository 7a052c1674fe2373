// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{guard::normalize_id, UserOrProvider},
    error::ApiError,
    models::{ApiResponse, FollowStatus},
    state::AppState,
    storage::{NotificationKind, NotificationRecord, PrincipalKind, PrincipalRef},
};

/// Follow or unfollow a property provider. Calling it again undoes it.
/// A new follow notifies the provider.
#[utoipa::path(
    post,
    path = "/api/propertyProvider/follow/{id}",
    params(("id" = String, Path, description = "Property provider to follow")),
    tag = "Providers",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Follow state toggled", body = ApiResponse<FollowStatus>),
        (status = 400, description = "A provider cannot follow itself"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an end user or property provider"),
        (status = 404, description = "No such provider")
    )
)]
pub async fn toggle_follow(
    UserOrProvider(caller): UserOrProvider,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FollowStatus>>, ApiError> {
    let not_found = || ApiError::not_found(format!("{} not found", PrincipalKind::PropertyProvider));
    let provider_id = Uuid::parse_str(&normalize_id(&id)).map_err(|_| not_found())?;

    if caller.kind == PrincipalKind::PropertyProvider && caller.id == provider_id {
        return Err(ApiError::bad_request("you cannot follow yourself"));
    }

    match state
        .credentials
        .get(PrincipalKind::PropertyProvider, provider_id)
        .await?
    {
        Some(provider) if !provider.is_deleted => {}
        _ => return Err(not_found()),
    }

    let following = state
        .credentials
        .toggle_follower(provider_id, caller.principal_ref())
        .await?;
    let followers = state
        .credentials
        .get(PrincipalKind::PropertyProvider, provider_id)
        .await?
        .map_or(0, |provider| provider.followers.len());
    info!(provider = %provider_id, follower = %caller.id, kind = %caller.kind, following, "follow toggled");

    if following {
        let recipient = PrincipalRef {
            id: provider_id,
            kind: PrincipalKind::PropertyProvider,
        };
        let note = NotificationRecord::new(
            recipient,
            caller.principal_ref(),
            NotificationKind::NewFollower,
            provider_id,
            format!("{} started following you", caller.username),
        );
        if let Err(e) = state.notifications.push(note).await {
            warn!(provider = %provider_id, error = %e, "follow notification not stored");
        }
    }

    let message = if following {
        "property provider followed successfully"
    } else {
        "property provider unfollowed successfully"
    };
    Ok(Json(ApiResponse::with_data(
        message,
        FollowStatus {
            following,
            followers,
        },
    )))
}
