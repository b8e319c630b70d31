// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OpenAI chat completions. Azure reuses the body and response shapes.

use serde_json::{json, Map, Value};

use super::{
    invalid_response, token_count, CanonicalChatRequest, CanonicalChatResponse, ProviderAdapter,
    ProviderConfig, ProviderRequest, Usage,
};
use crate::error::RelayError;

const PROVIDER: &str = "openai";

pub struct OpenAiAdapter {
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn translate_request(
        &self,
        request: &CanonicalChatRequest,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<ProviderRequest, RelayError> {
        let mut body = chat_body(request, config);
        body.insert("model".to_string(), json!(config.model));

        Ok(ProviderRequest {
            url: format!("{}/v1/chat/completions", self.base_url),
            headers: vec![("authorization", format!("Bearer {api_key}"))],
            body: Value::Object(body),
        })
    }

    fn translate_response(
        &self,
        body: &Value,
        config: &ProviderConfig,
    ) -> Result<CanonicalChatResponse, RelayError> {
        reshape_chat_completion(PROVIDER, body, config)
    }
}

/// Messages, sampling and stream flag in the OpenAI wire shape (no model).
pub(crate) fn chat_body(request: &CanonicalChatRequest, config: &ProviderConfig) -> Map<String, Value> {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
        .collect();

    let mut body = Map::new();
    body.insert("messages".to_string(), Value::Array(messages));
    body.insert(
        "temperature".to_string(),
        json!(config.effective_temperature(request)),
    );
    if let Some(max_tokens) = request.max_tokens {
        body.insert("max_tokens".to_string(), json!(max_tokens));
    }
    body.insert("stream".to_string(), json!(request.stream));
    body
}

/// Re-shape an OpenAI-style completion into the canonical response.
pub(crate) fn reshape_chat_completion(
    provider: &'static str,
    body: &Value,
    config: &ProviderConfig,
) -> Result<CanonicalChatResponse, RelayError> {
    let choice = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| invalid_response(provider, "missing choices"))?;

    let content = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .unwrap_or("stop");

    let usage = body.get("usage").cloned().unwrap_or(Value::Null);
    let prompt = token_count(&usage, "prompt_tokens");
    let completion = token_count(&usage, "completion_tokens");
    let usage = Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: usage
            .get("total_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(prompt.saturating_add(completion)),
    };

    let id = body
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{provider}-{}", uuid::Uuid::new_v4()));
    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(config.model.as_str());

    let mut response = CanonicalChatResponse::assistant(id, model, content, finish_reason, usage);
    if let Some(created) = body.get("created").and_then(Value::as_i64) {
        response.created = created;
    }
    Ok(response)
}
