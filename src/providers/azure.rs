// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Azure OpenAI deployments.
//!
//! The endpoint is assembled at call time from the key's base URL (or the
//! server-wide `AZURE_OPENAI_ENDPOINT`), its deployment and its API version.
//! Missing base URL or deployment is reported as
//! `ProviderConfigurationMissing`; creation does not validate them.

use serde_json::Value;

use super::{
    openai::{chat_body, reshape_chat_completion},
    CanonicalChatRequest, CanonicalChatResponse, ProviderAdapter, ProviderConfig, ProviderRequest,
};
use crate::error::RelayError;

const PROVIDER: &str = "azure";

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

pub struct AzureAdapter {
    default_base_url: Option<String>,
}

impl AzureAdapter {
    pub fn new(default_base_url: Option<&str>) -> Self {
        Self {
            default_base_url: default_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl ProviderAdapter for AzureAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn translate_request(
        &self,
        request: &CanonicalChatRequest,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<ProviderRequest, RelayError> {
        let base_url = non_empty(config.base_url.as_ref())
            .or(self.default_base_url.as_deref())
            .ok_or_else(|| RelayError::ProviderConfigurationMissing {
                provider: PROVIDER,
                missing: "base_url".to_string(),
            })?
            .trim_end_matches('/');

        let deployment = non_empty(config.deployment.as_ref()).ok_or_else(|| {
            RelayError::ProviderConfigurationMissing {
                provider: PROVIDER,
                missing: "deployment".to_string(),
            }
        })?;

        let api_version = non_empty(config.api_version.as_ref()).unwrap_or(DEFAULT_API_VERSION);

        let deployment = url::form_urlencoded::byte_serialize(deployment.as_bytes()).collect::<String>();
        let api_version = url::form_urlencoded::byte_serialize(api_version.as_bytes()).collect::<String>();

        Ok(ProviderRequest {
            url: format!(
                "{base_url}/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
            ),
            headers: vec![("api-key", api_key.to_string())],
            body: Value::Object(chat_body(request, config)),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{test_config, user_request, ChatRole};
    use serde_json::json;

    fn azure_config() -> ProviderConfig {
        let mut config = test_config("gpt-4");
        config.base_url = Some("https://acme.openai.azure.com/".to_string());
        config.deployment = Some("gpt4-prod".to_string());
        config
    }

    #[test]
    fn request_builds_deployment_url_with_default_version() {
        let req = AzureAdapter::new(None)
            .translate_request(&user_request("hi"), &azure_config(), "az-key")
            .unwrap();

        assert_eq!(
            req.url,
            "https://acme.openai.azure.com/openai/deployments/gpt4-prod/chat/completions?api-version=2024-02-15-preview"
        );
        assert_eq!(req.headers, vec![("api-key", "az-key".to_string())]);
        assert!(req.body.get("model").is_none());
        assert_eq!(req.body["messages"][0]["content"], "hi");
    }

    #[test]
    fn stored_api_version_wins() {
        let mut config = azure_config();
        config.api_version = Some("2024-06-01".to_string());
        let req = AzureAdapter::new(None)
            .translate_request(&user_request("hi"), &config, "k")
            .unwrap();
        assert!(req.url.ends_with("?api-version=2024-06-01"));
    }

    #[test]
    fn per_key_base_url_wins_over_server_default() {
        let req = AzureAdapter::new(Some("https://fallback.openai.azure.com"))
            .translate_request(&user_request("hi"), &azure_config(), "k")
            .unwrap();
        assert!(req.url.starts_with("https://acme.openai.azure.com/openai/"));
    }

    #[test]
    fn server_default_base_url_is_used_when_key_has_none() {
        let mut config = azure_config();
        config.base_url = None;
        let req = AzureAdapter::new(Some("https://fallback.openai.azure.com/"))
            .translate_request(&user_request("hi"), &config, "k")
            .unwrap();
        assert!(req
            .url
            .starts_with("https://fallback.openai.azure.com/openai/deployments/gpt4-prod/"));
    }

    #[test]
    fn missing_base_url_is_configuration_error() {
        let mut config = azure_config();
        config.base_url = Some("  ".to_string());
        let result = AzureAdapter::new(None).translate_request(&user_request("hi"), &config, "k");
        assert!(matches!(
            result,
            Err(RelayError::ProviderConfigurationMissing { provider: "azure", ref missing }) if missing == "base_url"
        ));
    }

    #[test]
    fn missing_deployment_is_configuration_error() {
        let mut config = azure_config();
        config.deployment = None;
        let result = AzureAdapter::new(None).translate_request(&user_request("hi"), &config, "k");
        assert!(matches!(
            result,
            Err(RelayError::ProviderConfigurationMissing { ref missing, .. }) if missing == "deployment"
        ));
    }

    #[test]
    fn response_is_normalized_like_openai() {
        let body = json!({
            "id": "chatcmpl-az",
            "choices": [{"message": {"role": "assistant", "content": "ok"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        });
        let resp = AzureAdapter::new(None)
            .translate_response(&body, &azure_config())
            .unwrap();
        assert_eq!(resp.model, "gpt-4");
        assert_eq!(resp.choices[0].message.role, ChatRole::Assistant);
        assert_eq!(resp.choices[0].finish_reason, "length");
        assert_eq!(resp.usage.total_tokens, 2);
    }
}
