// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One relay call, start to finish.
//!
//! ```text
//! authenticate -> select adapter -> decrypt key -> build request
//!     -> invoke provider -> (stream passthrough | normalize)
//! ```
//!
//! The first failing stage ends the call. Nothing is retried.

use std::{sync::Arc, time::Duration};

use serde_json::{json, Value};

use super::RelayAuthenticator;
use crate::{
    error::RelayError,
    providers::{
        CanonicalChatRequest, CanonicalChatResponse, ChatMessage, ChatRole, ProviderAdapter,
        ProviderAdapters, ProviderConfig, ProviderRequest,
    },
    storage::TransportKeyRecord,
    vault::CredentialVault,
};

/// Outcome of a successful relay call.
///
/// The two variants are two response contracts: `Normalized` is the
/// canonical chat-completion shape, `Stream` is the provider's own
/// server-sent-event framing, relayed byte for byte.
#[derive(Debug)]
pub enum RelayResponse {
    Normalized(CanonicalChatResponse),
    Stream {
        provider: &'static str,
        upstream: reqwest::Response,
    },
}

pub struct RelayOrchestrator {
    authenticator: RelayAuthenticator,
    vault: Arc<CredentialVault>,
    adapters: ProviderAdapters,
    http: reqwest::Client,
}

impl RelayOrchestrator {
    pub fn new(
        authenticator: RelayAuthenticator,
        vault: Arc<CredentialVault>,
        adapters: ProviderAdapters,
        http: reqwest::Client,
    ) -> Self {
        Self {
            authenticator,
            vault,
            adapters,
            http,
        }
    }

    /// Outbound client with connect and per-read timeouts.
    ///
    /// There is no total timeout, so long streams are not cut off.
    pub fn http_client(timeout: Duration) -> Result<reqwest::Client, RelayError> {
        reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to build HTTP client: {e}")))
    }

    /// Relay a canonical request using the presented transport secret.
    pub async fn relay(
        &self,
        presented: Option<String>,
        request: CanonicalChatRequest,
    ) -> Result<RelayResponse, RelayError> {
        if presented.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Err(RelayError::MissingTransportKey);
        }

        let authenticator = self.authenticator.clone();
        let record = tokio::task::spawn_blocking(move || authenticator.authenticate(presented.as_deref()))
            .await
            .map_err(|e| RelayError::Internal(format!("authentication task failed: {e}")))??;

        if request.messages.is_empty() {
            return Err(RelayError::InvalidRequest("messages must not be empty".to_string()));
        }

        let adapter = self.adapters.select(record.provider)?;
        let request = apply_record_defaults(request, &record);
        let config = ProviderConfig::from(&record);
        let provider_request = self.build_request(adapter, &request, &config, &record)?;

        tracing::info!(
            key_id = %record.id,
            provider = adapter.name(),
            model = %config.model,
            stream = request.stream,
            "Relaying chat request"
        );

        let upstream = self.invoke(adapter.name(), provider_request, &record.id).await?;

        if request.stream {
            return Ok(RelayResponse::Stream {
                provider: adapter.name(),
                upstream,
            });
        }

        let body: Value = upstream.json().await.map_err(|e| RelayError::InvalidProviderResponse {
            provider: adapter.name(),
            reason: format!("body is not JSON: {}", e.without_url()),
        })?;
        let response = adapter.translate_response(&body, &config)?;
        tracing::debug!(
            key_id = %record.id,
            total_tokens = response.usage.total_tokens,
            "Provider response normalized"
        );
        Ok(RelayResponse::Normalized(response))
    }

    /// Decrypt the provider key and build the outbound call.
    ///
    /// The plaintext key is dropped (and wiped) when this returns.
    fn build_request(
        &self,
        adapter: &dyn ProviderAdapter,
        request: &CanonicalChatRequest,
        config: &ProviderConfig,
        record: &TransportKeyRecord,
    ) -> Result<ProviderRequest, RelayError> {
        let api_key = self.vault.decrypt(&record.encrypted_provider_key).map_err(|e| {
            tracing::error!(
                key_id = %record.id,
                error = %e,
                "Stored provider key could not be decrypted; check ENCRYPTION_SECRET"
            );
            RelayError::from(e)
        })?;

        let mut provider_request = adapter.translate_request(request, config, &api_key)?;
        if let Value::Object(body) = &mut provider_request.body {
            for (name, value) in &record.custom_params {
                body.entry(name.clone()).or_insert_with(|| value.clone());
            }
        }
        Ok(provider_request)
    }

    /// POST the call and turn upstream failures into `ProviderCallFailed`.
    async fn invoke(
        &self,
        provider: &'static str,
        request: ProviderRequest,
        key_id: &str,
    ) -> Result<reqwest::Response, RelayError> {
        let mut builder = self.http.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        // `without_url` keeps query-string credentials out of errors and logs.
        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::warn!(key_id = %key_id, provider, error = %e, "Provider unreachable");
            RelayError::ProviderCallFailed {
                provider,
                status: None,
                details: Some(json!({ "message": e.to_string() })),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let details = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        tracing::warn!(
            key_id = %key_id,
            provider,
            status = status.as_u16(),
            "Provider returned an error status"
        );
        Err(RelayError::ProviderCallFailed {
            provider,
            status: Some(status.as_u16()),
            details: Some(details),
        })
    }
}

/// Prepend the record's system prompt when the caller sent none.
fn apply_record_defaults(
    mut request: CanonicalChatRequest,
    record: &TransportKeyRecord,
) -> CanonicalChatRequest {
    if let Some(prompt) = record.system_prompt.as_deref().filter(|p| !p.is_empty()) {
        if !request.has_system_message() {
            request
                .messages
                .insert(0, ChatMessage::new(ChatRole::System, prompt));
        }
    }
    request
}
