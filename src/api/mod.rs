// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::{FromRequest, MatchedPath},
    http::{HeaderValue, Request},
    middleware,
    routing::{delete, get, patch, post, put},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info_span, Span};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::rate_limit::limit_login_attempts,
    error::ApiError,
    models::{
        BanRequest, CreateListingRequest, FollowStatus, ForgotPasswordRequest, LikeStatus,
        ListingPageView, ListingView, LoginRequest, MessageResponse, NotificationView,
        Pagination, PendingVerification, PrincipalRefView, PrincipalView, RegisterRequest,
        ReportReceipt, ReportRequest, ResetPasswordRequest, UpdateAccountRequest,
        UpdateListingRequest, UserEnvelope, VerifyRequest,
    },
    state::AppState,
    storage::PrincipalKind,
};

pub mod accounts;
pub mod admin;
pub mod health;
pub mod listings;
pub mod notifications;
pub mod providers;

/// `Json` whose rejection renders the standard error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Routes every account kind shares. Login sits behind the throttle.
fn account_routes(state: &AppState) -> Router<AppState> {
    let login = Router::new()
        .route("/login", post(accounts::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_login_attempts,
        ));

    Router::new()
        .route("/verify", post(accounts::verify))
        .route("/user", get(accounts::current_principal))
        .route("/forgot-password", post(accounts::forgot_password))
        .route("/reset-password", post(accounts::reset_password))
        .route("/logout", post(accounts::logout))
        .merge(login)
}

pub fn router(state: AppState) -> Router {
    let user_routes = account_routes(&state)
        .route("/register", post(accounts::register))
        .route("/delete/{id}", delete(accounts::delete_account))
        .route("/users/{id}", put(accounts::update_user))
        .layer(Extension(PrincipalKind::EndUser));

    let provider_routes = account_routes(&state)
        .route("/register", post(accounts::register))
        .route("/delete/{id}", delete(accounts::delete_account))
        .route("/propertyProviders/{id}", put(accounts::update_provider))
        .route("/follow/{id}", post(providers::toggle_follow))
        .layer(Extension(PrincipalKind::PropertyProvider));

    let admin_routes = account_routes(&state)
        .route("/register", post(admin::register_admin))
        .route("/users", get(admin::list_users))
        .route("/propertyProviders", get(admin::list_providers))
        .route("/ban-propertyProvider/{id}", patch(admin::ban_provider))
        .route("/unban-propertyProvider/{id}", patch(admin::unban_provider))
        .layer(Extension(PrincipalKind::Administrator));

    let listing_routes = Router::new()
        .route(
            "/",
            get(listings::list_public).post(listings::create_listing),
        )
        .route("/mine", get(listings::list_mine))
        .route(
            "/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/{id}/like", post(listings::toggle_like))
        .route("/{id}/report", post(listings::report_listing));

    let notification_routes = Router::new()
        .route("/my-notifications", get(notifications::my_notifications))
        .route("/{id}/read", patch(notifications::mark_read));

    let cors = cors_layer(&state);

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/auth", user_routes)
        .nest("/api/propertyProvider", provider_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/listings", listing_routes)
        .nest("/api/notifications", notification_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors),
        )
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origin = state
        .config
        .cors_origin
        .as_ref()
        .and_then(|url| HeaderValue::from_str(url.origin().ascii_serialization().as_str()).ok());
    match origin {
        // Cookies only cross origins with an exact origin and credentials.
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = route,
        request_id
    )
}

struct SessionSecurity;

impl Modify for SessionSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::auth::session::SESSION_COOKIE,
                ))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        accounts::register,
        accounts::verify,
        accounts::login,
        accounts::current_principal,
        accounts::forgot_password,
        accounts::reset_password,
        accounts::logout,
        accounts::delete_account,
        accounts::update_user,
        accounts::update_provider,
        admin::register_admin,
        admin::list_users,
        admin::list_providers,
        admin::ban_provider,
        admin::unban_provider,
        providers::toggle_follow,
        listings::create_listing,
        listings::get_listing,
        listings::delete_listing,
        listings::toggle_like,
        listings::report_listing,
        listings::update_listing,
        listings::list_public,
        listings::list_mine,
        notifications::my_notifications,
        notifications::mark_read
    ),
    components(
        schemas(
            RegisterRequest,
            VerifyRequest,
            LoginRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            BanRequest,
            UpdateAccountRequest,
            CreateListingRequest,
            UpdateListingRequest,
            ReportRequest,
            MessageResponse,
            PendingVerification,
            PrincipalView,
            UserEnvelope,
            FollowStatus,
            ListingView,
            LikeStatus,
            ReportReceipt,
            Pagination,
            ListingPageView,
            PrincipalRefView,
            NotificationView,
            health::HealthResponse
        )
    ),
    modifiers(&SessionSecurity),
    tags(
        (name = "Accounts", description = "Registration, verification, login and password reset for every account kind"),
        (name = "Admin", description = "Administrator operations"),
        (name = "Providers", description = "Property provider social features"),
        (name = "Listings", description = "Property listings"),
        (name = "Notifications", description = "In-app notifications for end users and property providers"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;
