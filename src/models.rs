// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `ToSchema`
//! for the OpenAPI document.
//!
//! ## One-time secrets
//!
//! [`IssuedTransportKey`] and [`RegeneratedTransportKey`] are the only bodies
//! that ever carry a plaintext transport secret or provider key. They are
//! produced once per create/regenerate call and never reconstructed.
//!
//! ## Model Categories
//!
//! - **Transport keys**: create/update payloads and listings
//! - **Audit**: admin view of registry activity

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::storage::{AuditEvent, TransportKeyView};

// =============================================================================
// Transport Key Requests
// =============================================================================

/// Payload for creating a transport key.
///
/// Required fields are optional in the type so that a missing field is
/// reported as a 400 with a field name rather than a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateTransportKeyRequest {
    /// Human label. Required.
    pub nickname: Option<String>,
    /// `openai`, `anthropic`, `google`, `azure` or `other`. Required.
    pub provider: Option<String>,
    /// Model the relay will request. Required.
    pub model_name: Option<String>,
    /// The vendor credential. Required; returned once, then stored encrypted.
    pub provider_api_key: Option<String>,
    /// Azure resource endpoint (e.g. `https://acme.openai.azure.com`).
    pub base_url: Option<String>,
    /// Azure deployment name.
    pub deployment: Option<String>,
    /// Azure API version.
    pub api_version: Option<String>,
    /// Default sampling temperature, 0.0 to 2.0. Defaults to 0.7.
    pub temperature: Option<f32>,
    /// Prepended when a relay request carries no system message.
    pub system_prompt: Option<String>,
    /// Advisory rate limit. Defaults to 60.
    pub max_requests_per_minute: Option<u32>,
    /// Extra top-level fields merged into every provider request body.
    #[schema(value_type = Option<Object>)]
    pub custom_params: Option<Map<String, Value>>,
}

/// Payload for updating a transport key. Absent fields are left unchanged.
///
/// For the optional string settings (`base_url`, `deployment`, `api_version`,
/// `system_prompt`) an empty string clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTransportKeyRequest {
    pub nickname: Option<String>,
    pub provider: Option<String>,
    pub model_name: Option<String>,
    /// Replacement vendor credential. Re-encrypted, never echoed back.
    pub provider_api_key: Option<String>,
    pub base_url: Option<String>,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub max_requests_per_minute: Option<u32>,
    #[schema(value_type = Option<Object>)]
    pub custom_params: Option<Map<String, Value>>,
    pub active: Option<bool>,
}

// =============================================================================
// Transport Key Responses
// =============================================================================

/// Result of a create call. The only time either secret is returned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedTransportKey {
    pub key: TransportKeyView,
    /// Plaintext transport secret (`tkp_` + 64 hex characters).
    pub transport_key: String,
    /// The provider key exactly as submitted.
    pub provider_api_key: String,
}

/// Result of a regenerate call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegeneratedTransportKey {
    pub key: TransportKeyView,
    /// New plaintext transport secret. The previous one stops working.
    pub transport_key: String,
}

/// A page of transport keys.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransportKeyListResponse {
    pub keys: Vec<TransportKeyView>,
    pub total: usize,
}

/// Acknowledgement of a hard delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub id: String,
    pub deleted: bool,
}

// =============================================================================
// Audit
// =============================================================================

/// Recent registry activity, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditListResponse {
    pub events: Vec<AuditEvent>,
    pub total: usize,
}
