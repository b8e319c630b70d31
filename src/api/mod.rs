// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::{ApiError, ErrorBody, RelayError},
    models::{
        AuditListResponse, CreateTransportKeyRequest, DeleteResponse, IssuedTransportKey,
        RegeneratedTransportKey, TransportKeyListResponse, UpdateTransportKeyRequest,
    },
    providers::{CanonicalChatRequest, CanonicalChatResponse, ChatChoice, ChatMessage, ChatRole, Usage},
    state::AppState,
    storage::{AuditEvent, AuditEventType, Provider, TransportKeyView},
};

pub mod admin;
pub mod health;
pub mod relay;
pub mod transport_keys;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/transport-keys", get(transport_keys::list_my_keys))
        .route(
            "/users/{user_id}/transport-keys",
            get(transport_keys::list_user_keys).post(transport_keys::create_key),
        )
        .route(
            "/users/{user_id}/transport-keys/{key_id}",
            put(transport_keys::update_key).delete(transport_keys::delete_key),
        )
        .route(
            "/users/{user_id}/transport-keys/{key_id}/regenerate",
            post(transport_keys::regenerate_key),
        )
        .route("/admin/transport-keys", get(admin::list_all_keys))
        .route("/admin/audit", get(admin::query_audit))
        .route("/relay/chat", post(relay::relay_chat))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Run registry or store work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, RelayError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RelayError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
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
        transport_keys::list_my_keys,
        transport_keys::list_user_keys,
        transport_keys::create_key,
        transport_keys::update_key,
        transport_keys::delete_key,
        transport_keys::regenerate_key,
        admin::list_all_keys,
        admin::query_audit,
        relay::relay_chat,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(schemas(
        Provider,
        TransportKeyView,
        CreateTransportKeyRequest,
        UpdateTransportKeyRequest,
        IssuedTransportKey,
        RegeneratedTransportKey,
        TransportKeyListResponse,
        DeleteResponse,
        AuditEvent,
        AuditEventType,
        AuditListResponse,
        ChatRole,
        ChatMessage,
        CanonicalChatRequest,
        CanonicalChatResponse,
        ChatChoice,
        Usage,
        ErrorBody,
        health::ReadyResponse,
        health::HealthChecks,
        health::HealthResponse
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Transport Keys", description = "Transport-key lifecycle"),
        (name = "Relay", description = "Chat-completion relay authenticated by transport key"),
        (name = "Admin", description = "Admin-only views"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::UserClaims,
        state::{test_state, TEST_JWT_SECRET},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn bearer(sub: &str, role: &str) -> String {
        let claims = UserClaims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iss: None,
            role: Some(role.to_string()),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET))
            .unwrap();
        format!("Bearer {token}")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for path in [
            "/v1/transport-keys",
            "/v1/users/{user_id}/transport-keys",
            "/v1/users/{user_id}/transport-keys/{key_id}",
            "/v1/users/{user_id}/transport-keys/{key_id}/regenerate",
            "/v1/admin/transport-keys",
            "/v1/admin/audit",
            "/v1/relay/chat",
            "/health/ready",
        ] {
            assert!(doc["paths"].get(path).is_some(), "missing {path}");
        }
        assert!(doc["components"]["securitySchemes"].get("bearer_auth").is_some());
    }

    #[tokio::test]
    async fn liveness_echoes_request_id() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .header(REQUEST_ID_HEADER, "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
    }

    #[tokio::test]
    async fn key_routes_require_user_token() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/transport-keys")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "MISSING_AUTH_HEADER");
    }

    #[tokio::test]
    async fn create_and_list_through_router() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let app = router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/users/alice/transport-keys")
                    .header("authorization", bearer("alice", "user"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "nickname": "cli",
                            "provider": "openai",
                            "model_name": "gpt-4",
                            "provider_api_key": "sk-abc"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert!(created["transport_key"].as_str().unwrap().starts_with("tkp_"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/transport-keys")
                    .header("authorization", bearer("alice", "user"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = json_body(response).await;
        assert_eq!(listed["total"], 1);
        assert!(listed["keys"][0].get("transport_key").is_none());
        assert!(listed["keys"][0].get("secret_hash").is_none());
    }

    #[tokio::test]
    async fn admin_routes_reject_plain_users() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/admin/audit")
                    .header("authorization", bearer("alice", "user"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
