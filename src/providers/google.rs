// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Google Gemini `generateContent`.
//!
//! The provider key travels as the `key` query parameter, so the request URL
//! is itself a secret and must never be logged.

use serde_json::{json, Map, Value};

use super::{
    invalid_response, token_count, CanonicalChatRequest, CanonicalChatResponse, ChatRole,
    ProviderAdapter, ProviderConfig, ProviderRequest, Usage,
};
use crate::error::RelayError;

const PROVIDER: &str = "google";

pub struct GoogleAdapter {
    base_url: String,
}

impl GoogleAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn bad_base_url() -> RelayError {
    RelayError::ProviderConfigurationMissing {
        provider: PROVIDER,
        missing: "a valid base url".to_string(),
    }
}

/// Gemini knows only `user` and `model` turns.
fn gemini_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::Assistant => "model",
        _ => "user",
    }
}

impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn translate_request(
        &self,
        request: &CanonicalChatRequest,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<ProviderRequest, RelayError> {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                json!({
                    "role": gemini_role(m.role),
                    "parts": [{"text": m.content}],
                })
            })
            .collect();

        let mut generation = Map::new();
        generation.insert(
            "temperature".to_string(),
            json!(config.effective_temperature(request)),
        );
        if let Some(max_tokens) = request.max_tokens {
            generation.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }

        let mut body = Map::new();
        body.insert("contents".to_string(), Value::Array(contents));
        body.insert("generationConfig".to_string(), Value::Object(generation));

        let system: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| json!({"text": m.content}))
            .collect();
        if !system.is_empty() {
            body.insert("systemInstruction".to_string(), json!({"parts": system}));
        }

        let method = if request.stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let mut url = url::Url::parse(&self.base_url).map_err(|_| bad_base_url())?;
        url.path_segments_mut()
            .map_err(|_| bad_base_url())?
            .pop_if_empty()
            .extend(["v1beta", "models", &format!("{}:{method}", config.model)]);
        {
            let mut query = url.query_pairs_mut();
            if request.stream {
                query.append_pair("alt", "sse");
            }
            query.append_pair("key", api_key);
        }

        Ok(ProviderRequest {
            url: url.into(),
            headers: Vec::new(),
            body: Value::Object(body),
        })
    }

    fn translate_response(
        &self,
        body: &Value,
        config: &ProviderConfig,
    ) -> Result<CanonicalChatResponse, RelayError> {
        let candidate = body
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .ok_or_else(|| {
                let reason = body
                    .pointer("/promptFeedback/blockReason")
                    .and_then(Value::as_str)
                    .map(|r| format!("no candidates (blocked: {r})"))
                    .unwrap_or_else(|| "no candidates".to_string());
                invalid_response(PROVIDER, reason)
            })?;

        let text: String = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        let finish_reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map(str::to_lowercase)
            .unwrap_or_else(|| "stop".to_string());

        let meta = body.get("usageMetadata").cloned().unwrap_or(Value::Null);
        let prompt = token_count(&meta, "promptTokenCount");
        let completion = token_count(&meta, "candidatesTokenCount");
        let usage = Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: meta
                .get("totalTokenCount")
                .and_then(Value::as_u64)
                .unwrap_or(prompt.saturating_add(completion)),
        };

        let id = body
            .get("responseId")
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
