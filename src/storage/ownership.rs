// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for transport-key operations.
//!
//! Two checks apply to every registry call:
//!
//! - **User scope**: a caller may act on their own user id; only admins may
//!   target another user (`Forbidden` otherwise).
//! - **Record ownership**: a key that is absent, or that belongs to a
//!   different user than the one targeted, is reported as `NotFound` so
//!   existence of other users' keys is not revealed.

use crate::{auth::AuthenticatedUser, error::RelayError};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    fn owner_user_id(&self) -> &str;
}

/// Check that `user` may act on behalf of `target_user_id`.
pub fn check_user_scope(user: &AuthenticatedUser, target_user_id: &str) -> Result<(), RelayError> {
    if user.user_id == target_user_id || user.is_admin() {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %user.user_id,
            target_user_id = %target_user_id,
            "Non-admin attempted to act on another user's keys"
        );
        Err(RelayError::Forbidden(
            "cannot manage transport keys of another user".to_string(),
        ))
    }
}

/// Resolve a looked-up resource against the user it is expected to belong to.
pub trait OwnershipCheck<T> {
    fn owned_by(self, owner_user_id: &str, what: &str) -> Result<T, RelayError>;
}

impl<T: OwnedResource> OwnershipCheck<T> for Option<T> {
    fn owned_by(self, owner_user_id: &str, what: &str) -> Result<T, RelayError> {
        match self {
            Some(resource) if resource.owner_user_id() == owner_user_id => Ok(resource),
            _ => Err(RelayError::NotFound(what.to_string())),
        }
    }
}
