// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport Relay - chat-completion relay behind opaque transport keys
//!
//! Users register a transport key per provider configuration. Relay calls
//! present that key; the service finds the matching record, decrypts the
//! stored provider key for the duration of one call, and forwards the request
//! to OpenAI, Anthropic, Google or Azure OpenAI.
//!
//! ## Modules
//!
//! - `vault` - Provider-key encryption, transport-secret hashing and masking
//! - `storage` - redb tables for transport keys and audit events
//! - `registry` - Transport-key lifecycle (create, update, regenerate, delete, list)
//! - `providers` - Canonical chat shapes and one adapter per provider
//! - `relay` - Transport-key authentication and the relay call itself
//! - `auth` - User JWT authentication for the management API
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod registry;
pub mod relay;
pub mod state;
pub mod storage;
pub mod vault;
