// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The relay endpoint.
//!
//! ## Response contracts
//!
//! - `stream: false` (default): a normalized chat completion, identical in
//!   shape for every provider
//! - `stream: true`: `text/event-stream` carrying the provider's own SSE
//!   framing, unmodified. Clients must parse per provider.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderMap,
    },
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{ApiError, RelayError},
    providers::{CanonicalChatRequest, CanonicalChatResponse},
    relay::{presented_transport_key, RelayResponse},
    state::AppState,
};

pub const EVENT_STREAM: &str = "text/event-stream";

#[utoipa::path(
    post,
    path = "/v1/relay/chat",
    request_body = CanonicalChatRequest,
    tag = "Relay",
    params(
        ("X-Transport-Key" = Option<String>, Header, description = "Transport secret (alternatively `Authorization: Bearer`)")
    ),
    responses(
        (status = 200, description = "Normalized completion, or the provider's native SSE stream when `stream` is true", body = CanonicalChatResponse),
        (status = 400, description = "Empty messages or unsupported provider"),
        (status = 401, description = "Transport key missing or invalid"),
        (status = 422, description = "Key is missing provider configuration"),
        (status = 502, description = "Provider unreachable or returned an unusable body")
    )
)]
pub async fn relay_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CanonicalChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let presented = presented_transport_key(&headers).ok_or(RelayError::MissingTransportKey)?;
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    match state.relay.relay(Some(presented), request).await? {
        RelayResponse::Normalized(response) => Ok(Json(response).into_response()),
        RelayResponse::Stream { provider, upstream } => {
            tracing::debug!(provider, "Streaming provider response");
            Ok((
                [(CONTENT_TYPE, EVENT_STREAM), (CACHE_CONTROL, "no-cache")],
                Body::from_stream(upstream.bytes_stream()),
            )
                .into_response())
        }
    }
}
