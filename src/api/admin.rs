// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require the Admin role and provide:
//! - Every transport key in the system (no secret material)
//! - Recent audit events, optionally for one key

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::run_blocking;
use crate::{
    auth::AdminOnly,
    error::ApiError,
    models::{AuditListResponse, TransportKeyListResponse},
    state::AppState,
    storage::AuditRepository,
};

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;

/// Query parameters for audit log queries.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Only events for this transport key.
    pub key_id: Option<String>,
    /// Maximum number of results (default 100, capped at 1000).
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/v1/admin/transport-keys",
    tag = "Admin",
    responses(
        (status = 200, body = TransportKeyListResponse),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_all_keys(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
) -> Result<Json<TransportKeyListResponse>, ApiError> {
    let registry = state.registry.clone();
    let keys = run_blocking(move || registry.list_all()).await?;
    tracing::info!(admin_id = %admin.user_id, count = keys.len(), "Admin listed all transport keys");
    Ok(Json(TransportKeyListResponse {
        total: keys.len(),
        keys,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    params(AuditQueryParams),
    tag = "Admin",
    responses(
        (status = 200, body = AuditListResponse),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn query_audit(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditListResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(MAX_AUDIT_LIMIT);
    let db = state.db.clone();

    let events = run_blocking(move || {
        let repo = AuditRepository::new(&db);
        let events = match params.key_id.as_deref() {
            Some(key_id) => repo.for_resource(key_id, limit)?,
            None => repo.recent(limit)?,
        };
        Ok(events)
    })
    .await?;

    Ok(Json(AuditListResponse {
        total: events.len(),
        events,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{AuthenticatedUser, Role},
        models::CreateTransportKeyRequest,
        state::test_state,
        storage::AuditEventType,
    };

    fn admin() -> AdminOnly {
        AdminOnly(AuthenticatedUser {
            user_id: "root".to_string(),
            role: Role::Admin,
            issuer: None,
            expires_at: 0,
        })
    }

    fn seed(state: &AppState, owner: &str) -> String {
        let user = AuthenticatedUser {
            user_id: owner.to_string(),
            role: Role::User,
            issuer: None,
            expires_at: 0,
        };
        state
            .registry
            .create(
                &user,
                owner,
                CreateTransportKeyRequest {
                    nickname: Some("seed".to_string()),
                    provider: Some("openai".to_string()),
                    model_name: Some("gpt-4o".to_string()),
                    provider_api_key: Some("sk".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .key
            .id
    }

    #[tokio::test]
    async fn admin_sees_every_users_keys() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        seed(&state, "alice");
        seed(&state, "bob");

        let Json(listed) = list_all_keys(State(state), admin()).await.unwrap();
        assert_eq!(listed.total, 2);
        let owners: Vec<_> = listed.keys.iter().map(|k| k.owner_user_id.as_str()).collect();
        assert!(owners.contains(&"alice") && owners.contains(&"bob"));
    }

    #[tokio::test]
    async fn audit_query_filters_by_key() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let first = seed(&state, "alice");
        seed(&state, "bob");

        let Json(all) = query_audit(State(state.clone()), admin(), Query(AuditQueryParams::default()))
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let Json(one) = query_audit(
            State(state),
            admin(),
            Query(AuditQueryParams {
                key_id: Some(first.clone()),
                limit: Some(10),
            }),
        )
        .await
        .unwrap();
        assert_eq!(one.total, 1);
        assert_eq!(one.events[0].event_type, AuditEventType::KeyCreated);
        assert_eq!(one.events[0].resource_id.as_deref(), Some(first.as_str()));
    }
}
