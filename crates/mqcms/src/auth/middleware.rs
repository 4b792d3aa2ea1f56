//! Bearer-token check for admin routes.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::{AuthConfig, AuthError, ConfigValidationError};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(expected: &[u8], presented: &[u8]) -> bool {
    if expected.len() != presented.len() {
        return false;
    }
    expected
        .iter()
        .zip(presented)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Authentication state shared across handlers.
#[derive(Clone, Default)]
pub struct AuthState {
    admin_token: Option<Arc<str>>,
}

impl AuthState {
    /// Build from config, resolving `env:VAR_NAME` tokens.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        let admin_token = config.resolve_admin_token()?.map(Arc::from);
        if admin_token.is_none() {
            warn!("No admin token configured; mutating routes are unauthenticated");
        }
        Ok(Self { admin_token })
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            admin_token: Some(Arc::from(token)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.admin_token.is_some()
    }

    /// Check an Authorization header value against the configured token.
    pub fn authorize(&self, header: Option<&str>) -> Result<(), AuthError> {
        let Some(expected) = &self.admin_token else {
            return Ok(());
        };
        let header = header.ok_or(AuthError::MissingAuthHeader)?;
        let token = bearer_token_from_header(header)?;
        if tokens_match(expected.as_bytes(), token.as_bytes()) {
            Ok(())
        } else {
            debug!("Rejected admin request with a wrong token");
            Err(AuthError::InvalidToken)
        }
    }
}

/// Require the admin token.
///
/// Use as an extractor in handlers that mutate content or publish.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        auth.authorize(header)?;
        Ok(RequireAdmin)
    }
}
