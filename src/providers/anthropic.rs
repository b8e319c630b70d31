// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Anthropic Messages API.
//!
//! System messages travel in a top-level `system` field, not in `messages`.

use serde_json::{json, Map, Value};

use super::{
    invalid_response, token_count, CanonicalChatRequest, CanonicalChatResponse, ChatRole,
    ProviderAdapter, ProviderConfig, ProviderRequest, Usage,
};
use crate::error::RelayError;

const PROVIDER: &str = "anthropic";

/// Protocol version sent on every call.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Applied when neither the request nor the key sets a token limit.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicAdapter {
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn translate_request(
        &self,
        request: &CanonicalChatRequest,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<ProviderRequest, RelayError> {
        let (system, turns): (Vec<_>, Vec<_>) = request
            .messages
            .iter()
            .partition(|m| m.role == ChatRole::System);

        let messages: Vec<Value> = turns
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let mut body = Map::new();
        body.insert("model".to_string(), json!(config.model));
        body.insert("messages".to_string(), Value::Array(messages));
        body.insert(
            "max_tokens".to_string(),
            json!(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        );
        body.insert(
            "temperature".to_string(),
            json!(config.effective_temperature(request)),
        );
        body.insert("stream".to_string(), json!(request.stream));
        if !system.is_empty() {
            let joined = system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            body.insert("system".to_string(), json!(joined));
        }

        Ok(ProviderRequest {
            url: format!("{}/v1/messages", self.base_url),
            headers: vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
            body: Value::Object(body),
        })
    }

    fn translate_response(
        &self,
        body: &Value,
        config: &ProviderConfig,
    ) -> Result<CanonicalChatResponse, RelayError> {
        let blocks = body
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid_response(PROVIDER, "missing content"))?;

        let text: String = blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect();

        let finish_reason = map_stop_reason(body.get("stop_reason").and_then(Value::as_str));

        let usage = body.get("usage").cloned().unwrap_or(Value::Null);
        let usage = Usage::from_counts(
            token_count(&usage, "input_tokens"),
            token_count(&usage, "output_tokens"),
        );

        let id = body
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{PROVIDER}-{}", uuid::Uuid::new_v4()));

        Ok(CanonicalChatResponse::assistant(
            id,
            config.model.as_str(),
            text,
            finish_reason,
            usage,
        ))
    }
}

/// Translate Anthropic's `stop_reason` into the chat-completion vocabulary.
fn map_stop_reason(reason: Option<&str>) -> String {
    match reason {
        None | Some("end_turn") | Some("stop_sequence") => "stop".to_string(),
        Some("max_tokens") => "length".to_string(),
        Some("tool_use") => "tool_calls".to_string(),
        Some(other) => other.to_string(),
    }
}
