// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # User Authentication
//!
//! Transport-key management endpoints are called by signed-in users. User
//! identity is issued elsewhere; this module only checks the token.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <JWT>`
//! 2. Server verifies the HS256 signature, expiry and (if configured) issuer
//! 3. `sub` becomes the canonical `user_id`, `role` selects `admin` or `user`
//!
//! Relay calls do NOT use this module; they authenticate with a transport
//! key (see [`crate::relay::RelayAuthenticator`]).

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::{AuthenticatedUser, UserClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use roles::Role;
