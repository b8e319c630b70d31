// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{storage::StoreError, vault::VaultError};

/// Failure of a registry or relay operation.
///
/// Every variant maps to exactly one HTTP status in `From<RelayError> for ApiError`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("transport key is required")]
    MissingTransportKey,

    #[error("transport key is invalid or inactive")]
    InvalidTransportKey,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// Stored credential blob does not have the expected shape.
    #[error("stored provider credential is malformed")]
    MalformedCredential,

    /// Stored credential does not decrypt under the current server key.
    #[error("stored provider credential could not be decrypted")]
    DecryptionFailed,

    #[error("provider '{0}' is not supported")]
    UnsupportedProvider(String),

    #[error("provider '{provider}' is missing configuration: {missing}")]
    ProviderConfigurationMissing {
        provider: &'static str,
        missing: String,
    },

    /// Upstream returned an error status, or could not be reached (`status: None`).
    #[error("{provider} request failed{}", status_suffix(.status))]
    ProviderCallFailed {
        provider: &'static str,
        status: Option<u16>,
        details: Option<Value>,
    },

    #[error("{provider} returned an unexpected response: {reason}")]
    InvalidProviderResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

impl From<VaultError> for RelayError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::MalformedCredential(_) => RelayError::MalformedCredential,
            VaultError::DecryptionFailed => RelayError::DecryptionFailed,
            other => RelayError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for RelayError {
    fn from(err: StoreError) -> Self {
        match err {
            // A record removed between lookup and write reads as absent.
            StoreError::NotFound(what) => RelayError::NotFound(what),
            other => RelayError::Storage(other),
        }
    }
}

impl RelayError {
    /// Machine-readable code carried in the error envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            RelayError::MissingTransportKey => "MISSING_TRANSPORT_KEY",
            RelayError::InvalidTransportKey => "INVALID_TRANSPORT_KEY",
            RelayError::InvalidRequest(_) => "INVALID_REQUEST",
            RelayError::NotFound(_) => "NOT_FOUND",
            RelayError::Forbidden(_) => "FORBIDDEN",
            RelayError::MalformedCredential => "MALFORMED_CREDENTIAL",
            RelayError::DecryptionFailed => "DECRYPTION_FAILED",
            RelayError::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            RelayError::ProviderConfigurationMissing { .. } => "PROVIDER_CONFIGURATION_MISSING",
            RelayError::ProviderCallFailed { .. } => "PROVIDER_CALL_FAILED",
            RelayError::InvalidProviderResponse { .. } => "INVALID_PROVIDER_RESPONSE",
            RelayError::Storage(_) => "STORAGE_ERROR",
            RelayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingTransportKey | RelayError::InvalidTransportKey => {
                StatusCode::UNAUTHORIZED
            }
            RelayError::InvalidRequest(_) | RelayError::UnsupportedProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Forbidden(_) => StatusCode::FORBIDDEN,
            RelayError::ProviderConfigurationMissing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::ProviderCallFailed { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            RelayError::InvalidProviderResponse { .. } => StatusCode::BAD_GATEWAY,
            RelayError::MalformedCredential
            | RelayError::DecryptionFailed
            | RelayError::Storage(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Provider the failure is attributed to, when there is one.
    pub fn provider(&self) -> Option<&'static str> {
        match self {
            RelayError::ProviderConfigurationMissing { provider, .. }
            | RelayError::ProviderCallFailed { provider, .. }
            | RelayError::InvalidProviderResponse { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

/// JSON error envelope returned by every endpoint.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_code: &'static str,
    pub provider: Option<&'static str>,
    pub provider_status: Option<u16>,
    pub details: Option<Value>,
}

/// Wire shape of [`ApiError`].
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code,
            provider: None,
            provider_status: None,
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status = err.status_code();
        if status.is_server_error() && !matches!(err, RelayError::ProviderCallFailed { .. }) {
            tracing::error!(error = %err, code = err.error_code(), "Request failed");
        }

        let mut api = ApiError::new(status, err.error_code(), err.to_string());
        api.provider = err.provider();
        match err {
            RelayError::ProviderCallFailed {
                status: provider_status,
                details,
                ..
            } => {
                api.provider_status = provider_status;
                api.details = details;
            }
            // Internal detail stays in the log.
            RelayError::Storage(_) | RelayError::Internal(_) => {
                api.message = "internal server error".to_string();
            }
            _ => {}
        }
        api
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        RelayError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code.to_string(),
            provider: self.provider.map(str::to_string),
            provider_status: self.provider_status,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}
