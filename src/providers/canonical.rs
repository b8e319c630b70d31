// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider-agnostic chat shapes.
//!
//! Relay callers always send a [`CanonicalChatRequest`]. Non-streaming calls
//! always receive a [`CanonicalChatResponse`], whatever the upstream vendor.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Inbound relay request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CanonicalChatRequest {
    /// Ordered conversation; must not be empty.
    pub messages: Vec<ChatMessage>,
    /// Overrides the key's stored default when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// When true the provider's native event stream is forwarded unmodified.
    #[serde(default)]
    pub stream: bool,
}

impl CanonicalChatRequest {
    pub fn has_system_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == ChatRole::System)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    /// Build from prompt/completion counts when the provider omits a total.
    pub fn from_counts(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Normalized non-streaming response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CanonicalChatResponse {
    pub id: String,
    /// Always `chat.completion`.
    pub object: String,
    /// Unix timestamp (seconds).
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

impl CanonicalChatResponse {
    /// Single assistant message response.
    pub fn assistant(
        id: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
        finish_reason: impl Into<String>,
        usage: Usage,
    ) -> Self {
        Self {
            id: id.into(),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::new(ChatRole::Assistant, content),
                finish_reason: finish_reason.into(),
            }],
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_from_minimal_json() {
        let req: CanonicalChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert_eq!(req.messages[0], ChatMessage::new(ChatRole::User, "hi"));
        assert!(!req.stream);
        assert!(req.temperature.is_none());
        assert!(!req.has_system_message());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = serde_json::from_str::<CanonicalChatRequest>(
            r#"{"messages":[{"role":"tool","content":"x"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn usage_total_is_sum() {
        assert_eq!(Usage::from_counts(10, 5).total_tokens, 15);
        assert_eq!(Usage::from_counts(u64::MAX, 1).total_tokens, u64::MAX);
    }

    #[test]
    fn assistant_response_shape() {
        let resp = CanonicalChatResponse::assistant("id-1", "gpt-4", "hello", "stop", Usage::default());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["choices"][0]["message"]["role"], "assistant");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }
}
