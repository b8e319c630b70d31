// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Path
//!
//! - [`RelayAuthenticator`] resolves a presented transport secret to its record
//! - [`RelayOrchestrator`] drives one relay call through the provider adapters
//!
//! The relay path only reads transport-key records; it never writes them and
//! writes no audit events. Decrypted provider keys live for a single call.
//!
//! ## Cancellation
//!
//! Dropping the relay future (client went away before the response) drops the
//! in-flight `reqwest` call. Dropping a streamed body drops the upstream byte
//! stream and closes the provider connection.

pub mod authenticator;
pub mod orchestrator;

pub use authenticator::{presented_transport_key, RelayAuthenticator, TRANSPORT_KEY_HEADER};
pub use orchestrator::{RelayOrchestrator, RelayResponse};
