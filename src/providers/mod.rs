// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Provider Adapter Layer
//!
//! One [`ProviderAdapter`] per upstream wire protocol. Adapters are pure
//! translators: they never perform I/O and never see more than one request.
//!
//! | Provider | Endpoint | Auth |
//! |----------|----------|------|
//! | `openai` | `{base}/v1/chat/completions` | `Authorization: Bearer` |
//! | `anthropic` | `{base}/v1/messages` | `x-api-key` + `anthropic-version` |
//! | `google` | `{base}/v1beta/models/{model}:generateContent` | `key` query parameter |
//! | `azure` | `{base}/openai/deployments/{deployment}/chat/completions` | `api-key` |
//!
//! ## Streaming
//!
//! Request translation also covers streaming calls (the flag is forwarded in
//! each provider's own way). Response translation applies to non-streaming
//! bodies only; streamed bytes are relayed in the provider's native framing.

pub mod anthropic;
pub mod azure;
pub mod canonical;
pub mod google;
pub mod openai;

use std::fmt;

use serde_json::Value;

pub use anthropic::AnthropicAdapter;
pub use azure::AzureAdapter;
pub use canonical::{
    CanonicalChatRequest, CanonicalChatResponse, ChatChoice, ChatMessage, ChatRole, Usage,
};
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;

use crate::{
    config::ProviderEndpoints,
    error::RelayError,
    storage::{Provider, TransportKeyRecord},
};

/// The subset of a transport key that shapes the outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub model: String,
    pub base_url: Option<String>,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
    pub default_temperature: f32,
}

impl ProviderConfig {
    /// Request value first, else the key's stored default. `0.0` is a valid request value.
    pub fn effective_temperature(&self, request: &CanonicalChatRequest) -> f32 {
        request.temperature.unwrap_or(self.default_temperature)
    }
}

impl From<&TransportKeyRecord> for ProviderConfig {
    fn from(record: &TransportKeyRecord) -> Self {
        Self {
            model: record.model_name.clone(),
            base_url: record.base_url.clone(),
            deployment: record.deployment.clone(),
            api_version: record.api_version.clone(),
            default_temperature: record.temperature,
        }
    }
}

/// Fully built outbound call. Always a JSON `POST`.
#[derive(Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values and the query string may carry the provider key.
        let url = self.url.split('?').next().unwrap_or_default();
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        f.debug_struct("ProviderRequest")
            .field("url", &url)
            .field("headers", &header_names)
            .finish_non_exhaustive()
    }
}

/// Translator between the canonical chat shape and one provider's wire format.
pub trait ProviderAdapter: Send + Sync {
    /// Provider name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Build the provider call for a canonical request.
    fn translate_request(
        &self,
        request: &CanonicalChatRequest,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<ProviderRequest, RelayError>;

    /// Normalize a successful non-streaming provider body.
    fn translate_response(
        &self,
        body: &Value,
        config: &ProviderConfig,
    ) -> Result<CanonicalChatResponse, RelayError>;
}

/// The adapter set, one per supported provider.
pub struct ProviderAdapters {
    openai: OpenAiAdapter,
    anthropic: AnthropicAdapter,
    google: GoogleAdapter,
    azure: AzureAdapter,
}

impl ProviderAdapters {
    pub fn new(endpoints: &ProviderEndpoints) -> Self {
        Self {
            openai: OpenAiAdapter::new(&endpoints.openai),
            anthropic: AnthropicAdapter::new(&endpoints.anthropic),
            google: GoogleAdapter::new(&endpoints.google),
            azure: AzureAdapter::new(endpoints.azure_default.as_deref()),
        }
    }

    /// Adapter for a provider, or `UnsupportedProvider`.
    pub fn select(&self, provider: Provider) -> Result<&dyn ProviderAdapter, RelayError> {
        match provider {
            Provider::Openai => Ok(&self.openai),
            Provider::Anthropic => Ok(&self.anthropic),
            Provider::Google => Ok(&self.google),
            Provider::Azure => Ok(&self.azure),
            Provider::Other => Err(RelayError::UnsupportedProvider(provider.to_string())),
        }
    }
}

impl Default for ProviderAdapters {
    fn default() -> Self {
        Self::new(&ProviderEndpoints::default())
    }
}

/// Shorthand for a body that does not match the provider's documented shape.
pub(crate) fn invalid_response(provider: &'static str, reason: impl Into<String>) -> RelayError {
    RelayError::InvalidProviderResponse {
        provider,
        reason: reason.into(),
    }
}

/// Read a token counter, treating absent or non-numeric values as zero.
pub(crate) fn token_count(value: &Value, field: &str) -> u64 {
    value.get(field).and_then(Value::as_u64).unwrap_or(0)
}

#[cfg(test)]
pub(crate) fn test_config(model: &str) -> ProviderConfig {
    ProviderConfig {
        model: model.to_string(),
        base_url: None,
        deployment: None,
        api_version: None,
        default_temperature: 0.7,
    }
}

#[cfg(test)]
pub(crate) fn user_request(text: &str) -> CanonicalChatRequest {
    CanonicalChatRequest {
        messages: vec![ChatMessage::new(ChatRole::User, text)],
        temperature: None,
        max_tokens: None,
        stream: false,
    }
}
