//! Authentication
//!
//! Bearer tokens for the single administrator and the credential store
//! behind `/api/login`.
//!
//! Handlers never read auth state out of an untyped bag. They ask for one
//! of two extractors:
//!
//! - [`Identity`] when the route requires a valid token (rejects with 401)
//! - [`RequestContext`] when the route decides for itself what an
//!   unauthenticated caller gets
//!
//! The identity carried by both comes only from verified token claims.

mod credentials;
mod handler;
mod routes;
mod token;

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

pub use credentials::{Credentials, PasswordHasher};
pub use handler::{ChangePasswordRequest, LoginRequest, LoginResponse};
pub use routes::routes;
pub use token::{Claims, TokenService, bearer_token};

use crate::error::{AppError, AuthError};
use crate::handler::AppState;

/// The authenticated caller, as recorded in the token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Per-request auth outcome: either the caller's identity or the reason
/// there is none.
#[derive(Debug)]
pub struct RequestContext {
    identity: Result<Identity, AuthError>,
}

impl RequestContext {
    pub fn from_header(tokens: &TokenService, header: Option<&str>) -> Self {
        let identity = bearer_token(header)
            .and_then(|token| tokens.validate(token))
            .map(Identity::from);
        RequestContext { identity }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref().ok()
    }

    pub fn is_missing_credentials(&self) -> bool {
        matches!(self.identity, Err(AuthError::MissingHeader))
    }

    pub fn into_identity(self) -> Result<Identity, AuthError> {
        self.identity
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A header that isn't visible ASCII is malformed, not missing.
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());
        Ok(RequestContext::from_header(&state.tokens, header))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = match RequestContext::from_request_parts(parts, state).await {
            Ok(ctx) => ctx,
            Err(never) => match never {},
        };
        let identity = ctx.into_identity()?;
        tracing::debug!(
            user_id = identity.user_id,
            username = %identity.username,
            path = %parts.uri.path(),
            "request authenticated"
        );
        Ok(identity)
    }
}
