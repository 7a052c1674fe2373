// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only endpoints.
//!
//! `POST /api/admin/register` is the exception: it is open while no live
//! administrator exists, so the first admin can bootstrap the platform.
//! After that only an admin can create another admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ApiJson;
use crate::{
    accounts,
    auth::{guard::normalize_id, AdminOnly, AuthError},
    error::ApiError,
    models::{ApiResponse, BanRequest, PendingVerification, PrincipalView, RegisterRequest},
    state::AppState,
    storage::{BanInfo, PrincipalKind},
    validation::Checks,
};

fn provider_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(&normalize_id(raw))
        .map_err(|_| ApiError::not_found(format!("{} not found", PrincipalKind::PropertyProvider)))
}

#[utoipa::path(
    post,
    path = "/api/admin/register",
    request_body = RegisterRequest,
    tag = "Admin",
    security((), ("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 201, description = "Admin registered; verification code sent", body = ApiResponse<PendingVerification>),
        (status = 401, description = "An admin already exists and no credential was sent"),
        (status = 403, description = "An admin already exists and the caller is not one"),
        (status = 409, description = "Email or username already taken")
    )
)]
pub async fn register_admin(
    State(state): State<AppState>,
    caller: Result<AdminOnly, AuthError>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PendingVerification>>), ApiError> {
    if accounts::live_admin_exists(&state).await? {
        let AdminOnly(admin) = caller?;
        info!(by = %admin.id, "admin registering another admin");
    } else {
        info!("bootstrapping first admin");
    }

    let (_, issued) = accounts::register(&state, PrincipalKind::Administrator, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "User registered successfully. OTP sent to email.",
            issued.into(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "All end users, oldest first", body = ApiResponse<Vec<PrincipalView>>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PrincipalView>>>, ApiError> {
    let users = state.credentials.list(PrincipalKind::EndUser).await?;
    Ok(Json(ApiResponse::with_data(
        "users fetched successfully",
        users.iter().map(PrincipalView::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/propertyProviders",
    tag = "Admin",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "All property providers, oldest first", body = ApiResponse<Vec<PrincipalView>>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_providers(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PrincipalView>>>, ApiError> {
    let providers = state.credentials.list(PrincipalKind::PropertyProvider).await?;
    Ok(Json(ApiResponse::with_data(
        "property providers fetched successfully",
        providers.iter().map(PrincipalView::from).collect(),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/admin/ban-propertyProvider/{id}",
    params(("id" = String, Path, description = "Property provider id")),
    request_body = BanRequest,
    tag = "Admin",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Provider banned", body = ApiResponse<PrincipalView>),
        (status = 400, description = "Missing reason"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such provider")
    )
)]
pub async fn ban_provider(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<BanRequest>,
) -> Result<Json<ApiResponse<PrincipalView>>, ApiError> {
    Checks::new()
        .length("reason", &request.reason, 3, 500)
        .finish()
        .map_err(ApiError::validation)?;
    let id = provider_id(&id)?;

    let ban = BanInfo {
        reason: request.reason.trim().to_string(),
        banned_at: Utc::now(),
        banned_by: admin.id,
    };
    let record = state.credentials.set_ban(id, Some(ban)).await?;
    info!(provider = %id, by = %admin.id, "property provider banned");

    Ok(Json(ApiResponse::with_data(
        "property provider banned successfully",
        PrincipalView::from(&record),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/admin/unban-propertyProvider/{id}",
    params(("id" = String, Path, description = "Property provider id")),
    tag = "Admin",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Provider unbanned", body = ApiResponse<PrincipalView>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such provider")
    )
)]
pub async fn unban_provider(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PrincipalView>>, ApiError> {
    let id = provider_id(&id)?;
    let record = state.credentials.set_ban(id, None).await?;
    info!(provider = %id, by = %admin.id, "property provider unbanned");

    Ok(Json(ApiResponse::with_data(
        "property provider unbanned successfully",
        PrincipalView::from(&record),
    )))
}
