// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints mounted once per principal kind.
//!
//! The kind comes from the `Extension<PrincipalKind>` the router attaches
//! to each group (`/api/auth`, `/api/propertyProvider`, `/api/admin`).

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};

use super::ApiJson;
use crate::{
    accounts::{self, LoginOutcome, RESET_REQUESTED_MESSAGE, UNVERIFIED_MESSAGE},
    auth::{Auth, AuthError, ResolvedPrincipal, ScopedAuth},
    error::ApiError,
    models::{
        ApiResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PendingVerification,
        PrincipalView, RegisterRequest, ResetPasswordRequest, UpdateAccountRequest, UserEnvelope,
        VerifyRequest,
    },
    state::AppState,
    storage::PrincipalKind,
};

#[utoipa::path(
    post,
    path = "/api/{kind}/register",
    params(("kind" = String, Path, description = "`auth` or `propertyProvider`")),
    request_body = RegisterRequest,
    tag = "Accounts",
    responses(
        (status = 201, description = "Registered; verification code sent", body = ApiResponse<PendingVerification>),
        (status = 400, description = "Invalid fields"),
        (status = 409, description = "Email or username already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Extension(kind): Extension<PrincipalKind>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PendingVerification>>), ApiError> {
    let (_, issued) = accounts::register(&state, kind, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "User registered successfully. OTP sent to email.",
            issued.into(),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/verify",
    params(("kind" = String, Path, description = "`auth`, `propertyProvider` or `admin`")),
    request_body = VerifyRequest,
    tag = "Accounts",
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired code")
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Extension(kind): Extension<PrincipalKind>,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::verify_email(&state, kind, request).await?;
    Ok(Json(MessageResponse::new("Email verified successfully.")))
}

/// Sets the `authentication` cookie on success. An unverified account gets
/// a 403 carrying where the new code went.
#[utoipa::path(
    post,
    path = "/api/{kind}/login",
    params(("kind" = String, Path, description = "`auth`, `propertyProvider` or `admin`")),
    request_body = LoginRequest,
    tag = "Accounts",
    responses(
        (status = 200, description = "Logged in; session cookie set", body = MessageResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Banned, or email not verified", body = ApiResponse<PendingVerification>),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Extension(kind): Extension<PrincipalKind>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    match accounts::login(&state, kind, request).await? {
        LoginOutcome::Authenticated { token, .. } => {
            let cookie = state
                .cookie_policy()
                .session_cookie(&token.token)
                .ok_or_else(ApiError::internal)?;
            Ok((
                StatusCode::OK,
                [(SET_COOKIE, cookie)],
                Json(MessageResponse::new("user successfully logged in")),
            )
                .into_response())
        }
        LoginOutcome::VerificationRequired(issued) => Ok((
            StatusCode::FORBIDDEN,
            Json(ApiResponse {
                success: false,
                message: UNVERIFIED_MESSAGE.to_string(),
                data: Some(PendingVerification::from(issued)),
            }),
        )
            .into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/{kind}/user",
    params(("kind" = String, Path, description = "`auth`, `propertyProvider` or `admin`")),
    tag = "Accounts",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "The signed-in principal", body = ApiResponse<UserEnvelope>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn current_principal(
    ScopedAuth(principal): ScopedAuth,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserEnvelope>>, ApiError> {
    let record = state
        .credentials
        .get(principal.kind, principal.id)
        .await?
        .ok_or(AuthError::Unauthenticated)?;
    Ok(Json(ApiResponse::with_data(
        "user found successfully",
        UserEnvelope {
            user: PrincipalView::from(&record),
        },
    )))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/forgot-password",
    params(("kind" = String, Path, description = "`auth`, `propertyProvider` or `admin`")),
    request_body = ForgotPasswordRequest,
    tag = "Accounts",
    responses(
        (status = 200, description = "Same answer whether or not the account exists", body = MessageResponse)
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Extension(kind): Extension<PrincipalKind>,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::forgot_password(&state, kind, request).await?;
    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/reset-password",
    params(("kind" = String, Path, description = "`auth`, `propertyProvider` or `admin`")),
    request_body = ResetPasswordRequest,
    tag = "Accounts",
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Invalid or expired code")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(kind): Extension<PrincipalKind>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::reset_password(&state, kind, request).await?;
    Ok(Json(MessageResponse::new("Password reset successfully.")))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/logout",
    params(("kind" = String, Path, description = "`auth`, `propertyProvider` or `admin`")),
    tag = "Accounts",
    responses((status = 200, description = "Session cookie cleared", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cookie = state
        .cookie_policy()
        .clearing_cookie()
        .ok_or_else(ApiError::internal)?;
    Ok((
        [(SET_COOKIE, cookie)],
        Json(MessageResponse::new("user successfully logged out")),
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/{kind}/delete/{id}",
    params(
        ("kind" = String, Path, description = "`auth` or `propertyProvider`"),
        ("id" = String, Path, description = "Principal id, any UUID encoding")
    ),
    tag = "Accounts",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account soft deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Neither the account owner nor an admin"),
        (status = 404, description = "No such account")
    )
)]
pub async fn delete_account(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Extension(kind): Extension<PrincipalKind>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::soft_delete(&state, &caller, kind, &id).await?;
    Ok(Json(MessageResponse::new(format!("{kind} deleted successfully"))))
}

async fn update_scoped(
    state: &AppState,
    caller: &ResolvedPrincipal,
    kind: PrincipalKind,
    id: &str,
    request: UpdateAccountRequest,
    message: &str,
) -> Result<Json<ApiResponse<UserEnvelope>>, ApiError> {
    let record = accounts::update_profile(state, caller, kind, id, request).await?;
    Ok(Json(ApiResponse::with_data(
        message,
        UserEnvelope {
            user: PrincipalView::from(&record),
        },
    )))
}

#[utoipa::path(
    put,
    path = "/api/auth/users/{id}",
    params(("id" = String, Path, description = "End user id, any UUID encoding")),
    request_body = UpdateAccountRequest,
    tag = "Accounts",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserEnvelope>),
        (status = 400, description = "Invalid fields, or nothing to update"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Neither the account owner nor an admin"),
        (status = 404, description = "No such account"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_user(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<UserEnvelope>>, ApiError> {
    update_scoped(
        &state,
        &caller,
        PrincipalKind::EndUser,
        &id,
        request,
        "User updated successfully",
    )
    .await
}

/// Providers may also change `firstname`, `lastname` and `bio`.
#[utoipa::path(
    put,
    path = "/api/propertyProvider/propertyProviders/{id}",
    params(("id" = String, Path, description = "Property provider id, any UUID encoding")),
    request_body = UpdateAccountRequest,
    tag = "Accounts",
    security(("cookie_auth" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserEnvelope>),
        (status = 400, description = "Invalid fields, or nothing to update"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Neither the account owner nor an admin"),
        (status = 404, description = "No such account"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_provider(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<UserEnvelope>>, ApiError> {
    update_scoped(
        &state,
        &caller,
        PrincipalKind::PropertyProvider,
        &id,
        request,
        "Property provider updated successfully",
    )
    .await
}
