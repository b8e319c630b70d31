// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, Validation};

use super::{claims::UserClaims, AuthenticatedUser, AuthError};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
///
/// ## Authentication Modes
///
/// - **Verified** (`JWT_SECRET` set): HS256 signature, expiry and optional issuer checks
/// - **Development** (`RELAY_DEV_MODE` without `JWT_SECRET`): claims decoded, signature ignored
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token.trim(), &state.auth)?;
        Ok(Auth(user))
    }
}

/// Verify a user token and extract the caller.
pub fn verify_jwt(token: &str, config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    match &config.decoding_key {
        Some(key) => {
            let mut validation = Validation::new(Algorithm::HS256);
            validation.leeway = CLOCK_SKEW_LEEWAY;
            validation.validate_aud = false;
            if let Some(issuer) = &config.issuer {
                validation.set_issuer(&[issuer]);
            }

            let data = decode::<UserClaims>(token, key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                _ => AuthError::MalformedToken,
            })?;
            Ok(AuthenticatedUser::from_claims(data.claims))
        }
        None => verify_jwt_development(token),
    }
}

/// Development-mode decoding (no signature check).
fn verify_jwt_development(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<UserClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;
    let claims = data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(AuthenticatedUser::from_claims(claims))
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            tracing::warn!(user_id = %user.user_id, "Non-admin attempted admin access");
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"unit-test-jwt-secret";

    fn token(sub: &str, role: Option<&str>, exp_offset: i64, iss: Option<&str>) -> String {
        let claims = UserClaims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            iss: iss.map(str::to_string),
            role: role.map(str::to_string),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn verified(issuer: Option<&str>) -> AuthConfig {
        AuthConfig::hs256(SECRET, issuer.map(str::to_string))
    }

    #[test]
    fn valid_token_yields_user() {
        let user = verify_jwt(&token("user_1", Some("admin"), 3600, None), &verified(None)).unwrap();
        assert_eq!(user.user_id, "user_1");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = AuthConfig::hs256(b"another-secret", None);
        let result = verify_jwt(&token("user_1", None, 3600, None), &config);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let result = verify_jwt(&token("user_1", None, -3600, None), &verified(None));
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let config = verified(Some("https://auth.example.com"));
        let ok = token("user_1", None, 3600, Some("https://auth.example.com"));
        let bad = token("user_1", None, 3600, Some("https://evil.example.com"));

        assert!(verify_jwt(&ok, &config).is_ok());
        assert!(matches!(verify_jwt(&bad, &config), Err(AuthError::InvalidIssuer)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            verify_jwt("not.a.jwt", &verified(None)),
            Err(AuthError::MalformedToken)
        ));
        assert!(matches!(
            verify_jwt("garbage", &AuthConfig::insecure()),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn development_mode_ignores_signature() {
        let config = AuthConfig::insecure();
        let user = verify_jwt(&token("dev_user", Some("user"), 3600, None), &config).unwrap();
        assert_eq!(user.user_id, "dev_user");
        assert_eq!(user.role, Role::User);

        let expired = token("dev_user", None, -3600, None);
        assert!(matches!(verify_jwt(&expired, &config), Err(AuthError::TokenExpired)));
    }
}
