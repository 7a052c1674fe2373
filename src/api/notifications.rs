// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    auth::{guard::normalize_id, UserOrProvider},
    error::ApiError,
    models::{ApiResponse, NotificationView},
    state::AppState,
};

/// The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications/my-notifications",
    tag = "Notifications",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications addressed to the caller", body = ApiResponse<Vec<NotificationView>>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an end user or property provider")
    )
)]
pub async fn my_notifications(
    UserOrProvider(caller): UserOrProvider,
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<NotificationView>>> {
    let notes = state.notifications.for_recipient(caller.principal_ref()).await;
    Json(ApiResponse::with_data(
        "notifications retrieved successfully",
        notes.iter().map(NotificationView::from).collect(),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification id")),
    tag = "Notifications",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Marked read", body = ApiResponse<NotificationView>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an end user or property provider"),
        (status = 404, description = "No such notification for the caller")
    )
)]
pub async fn mark_read(
    UserOrProvider(caller): UserOrProvider,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NotificationView>>, ApiError> {
    let id = Uuid::parse_str(&normalize_id(&id))
        .map_err(|_| ApiError::not_found("notification not found"))?;
    let note = state
        .notifications
        .mark_read(id, caller.principal_ref())
        .await?;
    Ok(Json(ApiResponse::with_data(
        "notification marked as read",
        NotificationView::from(&note),
    )))
}
