//! Authentication middleware for Axum
//!
//! Resolves the bearer token into an [`Identity`] once per request and
//! stores it in the request extensions as [`AuthenticatedUser`].

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::Identity;
use crate::infrastructure::crypto::jwt::{verify_token, AuthError, JwtConfig};
use crate::interfaces::http::common::ApiResponse;

/// Turns a presented credential into a caller identity
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Identity from HS256 JWTs issued by the account subsystem
pub struct JwtIdentityProvider {
    config: JwtConfig,
}

impl JwtIdentityProvider {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn identify(&self, token: &str) -> Result<Identity, AuthError> {
        verify_token(token, &self.config)?.identity()
    }
}

/// Authentication state shared by protected routes
#[derive(Clone)]
pub struct AuthState {
    pub identity: Arc<dyn IdentityProvider>,
}

/// Caller identity placed in request extensions by [`auth_middleware`]
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser(pub Identity);

pub fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_token)
}

/// JWT authentication middleware - requires a valid token
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return auth_error_response(AuthError::MissingToken);
    };

    match auth_state.identity.identify(token) {
        Ok(identity) => {
            request.extensions_mut().insert(AuthenticatedUser(identity));
            next.run(request).await
        }
        Err(e) => auth_error_response(e),
    }
}

pub fn auth_error_response(error: AuthError) -> Response {
    let body = Json(ApiResponse::<()>::error(format!("Unauthorized: {}", error)));
    (StatusCode::UNAUTHORIZED, body).into_response()
}
