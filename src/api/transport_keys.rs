// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport-key management endpoints.
//!
//! Create and regenerate are the only responses that carry plaintext
//! secrets. Store them client-side; they cannot be fetched again.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::run_blocking;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        CreateTransportKeyRequest, DeleteResponse, IssuedTransportKey, RegeneratedTransportKey,
        TransportKeyListResponse, UpdateTransportKeyRequest,
    },
    state::AppState,
    storage::TransportKeyView,
};

#[utoipa::path(
    get,
    path = "/v1/transport-keys",
    tag = "Transport Keys",
    responses(
        (status = 200, body = TransportKeyListResponse),
        (status = 401, description = "Missing or invalid user token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_keys(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<TransportKeyListResponse>, ApiError> {
    let registry = state.registry.clone();
    let keys = run_blocking(move || registry.list(&user, &user.user_id)).await?;
    Ok(Json(TransportKeyListResponse {
        total: keys.len(),
        keys,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/transport-keys",
    params(("user_id" = String, Path, description = "Owner of the keys")),
    tag = "Transport Keys",
    responses(
        (status = 200, body = TransportKeyListResponse),
        (status = 403, description = "Caller is neither the user nor an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_user_keys(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
) -> Result<Json<TransportKeyListResponse>, ApiError> {
    let registry = state.registry.clone();
    let keys = run_blocking(move || registry.list(&user, &user_id)).await?;
    Ok(Json(TransportKeyListResponse {
        total: keys.len(),
        keys,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/transport-keys",
    params(("user_id" = String, Path, description = "Owner of the new key")),
    request_body = CreateTransportKeyRequest,
    tag = "Transport Keys",
    responses(
        (status = 201, description = "Key created; secrets are shown only in this response", body = IssuedTransportKey),
        (status = 400, description = "Missing or invalid field"),
        (status = 403, description = "Caller is neither the user nor an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_key(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(user_id): Path<String>,
    Json(request): Json<CreateTransportKeyRequest>,
) -> Result<(StatusCode, Json<IssuedTransportKey>), ApiError> {
    let registry = state.registry.clone();
    let issued = run_blocking(move || registry.create(&user, &user_id, request)).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/transport-keys/{key_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the key"),
        ("key_id" = String, Path, description = "Transport key identifier")
    ),
    request_body = UpdateTransportKeyRequest,
    tag = "Transport Keys",
    responses(
        (status = 200, body = TransportKeyView),
        (status = 404, description = "No such key for this user")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_key(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path((user_id, key_id)): Path<(String, String)>,
    Json(request): Json<UpdateTransportKeyRequest>,
) -> Result<Json<TransportKeyView>, ApiError> {
    let registry = state.registry.clone();
    let view = run_blocking(move || registry.update(&user, &user_id, &key_id, request)).await?;
    Ok(Json(view))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{user_id}/transport-keys/{key_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the key"),
        ("key_id" = String, Path, description = "Transport key identifier")
    ),
    tag = "Transport Keys",
    responses(
        (status = 200, body = DeleteResponse),
        (status = 404, description = "No such key for this user")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_key(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path((user_id, key_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let registry = state.registry.clone();
    let id = key_id.clone();
    run_blocking(move || registry.delete(&user, &user_id, &id)).await?;
    Ok(Json(DeleteResponse {
        id: key_id,
        deleted: true,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/transport-keys/{key_id}/regenerate",
    params(
        ("user_id" = String, Path, description = "Owner of the key"),
        ("key_id" = String, Path, description = "Transport key identifier")
    ),
    tag = "Transport Keys",
    responses(
        (status = 200, description = "New secret; the previous one is revoked", body = RegeneratedTransportKey),
        (status = 404, description = "No such key for this user")
    ),
    security(("bearer_auth" = []))
)]
pub async fn regenerate_key(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path((user_id, key_id)): Path<(String, String)>,
) -> Result<Json<RegeneratedTransportKey>, ApiError> {
    let registry = state.registry.clone();
    let rotated = run_blocking(move || registry.regenerate(&user, &user_id, &key_id)).await?;
    Ok(Json(rotated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{AuthenticatedUser, Role},
        state::test_state,
    };

    fn auth(user_id: &str, role: Role) -> Auth {
        Auth(AuthenticatedUser {
            user_id: user_id.to_string(),
            role,
            issuer: None,
            expires_at: 0,
        })
    }

    fn create_request() -> CreateTransportKeyRequest {
        CreateTransportKeyRequest {
            nickname: Some("laptop".to_string()),
            provider: Some("google".to_string()),
            model_name: Some("gemini-1.5-pro".to_string()),
            provider_api_key: Some("AIza-test".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_list_own_keys() {
        let (state, _dir) = test_state("http://127.0.0.1:9");

        let (status, Json(issued)) = create_key(
            State(state.clone()),
            auth("alice", Role::User),
            Path("alice".to_string()),
            Json(create_request()),
        )
        .await
        .expect("key creation succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(issued.provider_api_key, "AIza-test");
        assert!(issued.transport_key.starts_with("tkp_"));

        let Json(listed) = list_my_keys(State(state.clone()), auth("alice", Role::User))
            .await
            .expect("listing succeeds");
        assert_eq!(listed.total, 1);
        assert_eq!(listed.keys[0].id, issued.key.id);
        assert_eq!(listed.keys[0].display_key, issued.key.display_key);
    }

    #[tokio::test]
    async fn create_for_another_user_is_forbidden() {
        let (state, _dir) = test_state("http://127.0.0.1:9");

        let err = create_key(
            State(state),
            auth("mallory", Role::User),
            Path("alice".to_string()),
            Json(create_request()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.error_code, "FORBIDDEN");
    }

    #[tokio::test]
    async fn missing_nickname_is_bad_request() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let mut request = create_request();
        request.nickname = None;

        let err = create_key(
            State(state),
            auth("alice", Role::User),
            Path("alice".to_string()),
            Json(request),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("nickname"));
    }

    #[tokio::test]
    async fn update_regenerate_delete_flow() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let (_, Json(issued)) = create_key(
            State(state.clone()),
            auth("alice", Role::User),
            Path("alice".to_string()),
            Json(create_request()),
        )
        .await
        .unwrap();
        let ids = || ("alice".to_string(), issued.key.id.clone());

        let Json(updated) = update_key(
            State(state.clone()),
            auth("alice", Role::User),
            Path(ids()),
            Json(UpdateTransportKeyRequest {
                model_name: Some("gemini-1.5-flash".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.model_name, "gemini-1.5-flash");

        let Json(rotated) = regenerate_key(State(state.clone()), auth("alice", Role::User), Path(ids()))
            .await
            .unwrap();
        assert_ne!(rotated.transport_key, issued.transport_key);

        let Json(deleted) = delete_key(State(state.clone()), auth("alice", Role::User), Path(ids()))
            .await
            .unwrap();
        assert!(deleted.deleted);

        let err = delete_key(State(state), auth("alice", Role::User), Path(ids()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_lists_any_user() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        create_key(
            State(state.clone()),
            auth("alice", Role::User),
            Path("alice".to_string()),
            Json(create_request()),
        )
        .await
        .unwrap();

        let Json(listed) = list_user_keys(
            State(state.clone()),
            auth("root", Role::Admin),
            Path("alice".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(listed.total, 1);

        let err = list_user_keys(State(state), auth("bob", Role::User), Path("alice".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
