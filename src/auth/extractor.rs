// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated principals.
//!
//! ```rust,ignore
//! async fn create_listing(
//!     ProviderAuth(provider): ProviderAuth,
//!     State(state): State<AppState>,
//!     Json(body): Json<CreateListingRequest>,
//! ) -> Result<Json<ListingResponse>, ApiError> {
//!     // provider.kind == PrincipalKind::PropertyProvider
//! }
//! ```
//!
//! A missing, invalid or dead credential is a 401. A live principal of a
//! role the extractor does not accept is a 403.
//!
//! | Extractor | Accepts |
//! |-----------|---------|
//! | [`Auth`] | any live principal |
//! | [`ScopedAuth`] | the kind the route group was mounted for |
//! | [`ProviderAuth`] | property providers |
//! | [`AdminOnly`] | administrators |
//! | [`UserOrProvider`] | end user first, then property provider |

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{
    claims::ResolvedPrincipal,
    guard::require_role,
    resolver::{Accept, PrincipalResolver},
    session::credential_candidates,
    AuthError, Role,
};
use crate::{state::AppState, storage::PrincipalKind};

async fn resolve_parts(
    parts: &Parts,
    state: &AppState,
    accept: Accept,
) -> Result<ResolvedPrincipal, AuthError> {
    // A principal placed by an upstream layer or a test short-circuits
    // token handling, as long as it is acceptable here.
    if let Some(principal) = parts.extensions.get::<ResolvedPrincipal>() {
        let acceptable = match accept {
            Accept::Any => true,
            Accept::Kind(kind) => principal.kind == kind,
            Accept::UserOrProvider => matches!(
                principal.kind,
                PrincipalKind::EndUser | PrincipalKind::PropertyProvider
            ),
        };
        if acceptable {
            return Ok(principal.clone());
        }
    }

    let candidates = credential_candidates(&parts.headers);
    PrincipalResolver::new(&state.tokens, state.credentials.as_ref())
        .resolve(&candidates, accept)
        .await
}

/// Resolve a principal whose role is in `allowed`.
///
/// When no acceptable principal is found but the request still carries a
/// valid live principal of another role, the answer is 403 rather than 401.
async fn resolve_with_role(
    parts: &Parts,
    state: &AppState,
    accept: Accept,
    allowed: &[Role],
) -> Result<ResolvedPrincipal, AuthError> {
    match resolve_parts(parts, state, accept).await {
        Err(AuthError::Unauthenticated) => {
            let principal = resolve_parts(parts, state, Accept::Any).await?;
            require_role(&principal, allowed)?;
            Ok(principal)
        }
        other => other,
    }
}

/// Any live principal.
#[derive(Debug, Clone)]
pub struct Auth(pub ResolvedPrincipal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_parts(parts, state, Accept::Any).await.map(Auth)
    }
}

/// A principal of the kind the enclosing router was mounted for.
///
/// The account routes are built once per kind and tagged with an
/// `Extension<PrincipalKind>`; this extractor reads that tag.
#[derive(Debug, Clone)]
pub struct ScopedAuth(pub ResolvedPrincipal);

impl FromRequestParts<AppState> for ScopedAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let kind = parts
            .extensions
            .get::<PrincipalKind>()
            .copied()
            .ok_or(AuthError::Unauthenticated)?;
        resolve_with_role(parts, state, Accept::Kind(kind), &[kind.role()])
            .await
            .map(ScopedAuth)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderAuth(pub ResolvedPrincipal);

impl FromRequestParts<AppState> for ProviderAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_with_role(
            parts,
            state,
            Accept::Kind(PrincipalKind::PropertyProvider),
            &[Role::PropertyProvider],
        )
        .await
        .map(ProviderAuth)
    }
}

/// Administrator-only endpoints.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub ResolvedPrincipal);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_with_role(
            parts,
            state,
            Accept::Kind(PrincipalKind::Administrator),
            &[Role::Admin],
        )
        .await
        .map(AdminOnly)
    }
}

/// Endpoints open to both end users and property providers.
#[derive(Debug, Clone)]
pub struct UserOrProvider(pub ResolvedPrincipal);

impl FromRequestParts<AppState> for UserOrProvider {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_with_role(
            parts,
            state,
            Accept::UserOrProvider,
            &[Role::User, Role::PropertyProvider],
        )
        .await
        .map(UserOrProvider)
    }
}
