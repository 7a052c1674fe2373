// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{state::AppState, storage::PrincipalKind};

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Whether the credential store answers a read.
    pub credentials: String,
    /// `persistent` when backed by the embedded database.
    pub storage: String,
}

/// Returns 200 if the credential store is readable, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Credential store unavailable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let credentials_ok = state
        .credentials
        .list(PrincipalKind::Administrator)
        .await
        .is_ok();

    let response = HealthResponse {
        status: if credentials_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            credentials: if credentials_ok { "ok" } else { "unavailable" }.to_string(),
            storage: if state.config.data_dir.is_some() {
                "persistent"
            } else {
                "memory"
            }
            .to_string(),
        },
    };

    let status = if credentials_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
