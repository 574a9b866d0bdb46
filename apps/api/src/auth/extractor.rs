//! Bearer-session extractors.
//!
//! `Authorization: Bearer <session token>`. Handlers that require a signed-in
//! user take [`CurrentUser`]; handlers that personalise when possible take
//! [`MaybeUser`].

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::AuthUser;
use crate::state::AppState;

const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    pub token: Uuid,
}

#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref().map(|c| &c.user)
    }
}

pub fn bearer_token(parts: &Parts) -> Option<Uuid> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}

/// The page a user returns to after signing in: the API path without its prefix.
pub fn return_path(api_path: &str) -> &str {
    match api_path.strip_prefix(API_PREFIX) {
        Some("") | None => "/",
        Some(path) => path,
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let login = || AppError::login_required(return_path(parts.uri.path()));

        let token = bearer_token(parts).ok_or_else(login)?;
        let user = state.auth.get_user(token).await?.ok_or_else(login)?;
        Ok(CurrentUser { user, token })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeUser(None));
        };
        match state.auth.get_user(token).await {
            Ok(user) => Ok(MaybeUser(user.map(|user| CurrentUser { user, token }))),
            Err(e) => {
                warn!("Session lookup failed, continuing as guest: {e}");
                Ok(MaybeUser(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/onboarding");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        let token = Uuid::new_v4();
        assert_eq!(bearer_token(&parts(Some(&format!("Bearer {token}")))), Some(token));
        assert_eq!(bearer_token(&parts(Some("Bearer not-a-uuid"))), None);
        assert_eq!(bearer_token(&parts(Some(&format!("Basic {token}")))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_return_path_strips_api_prefix() {
        assert_eq!(return_path("/api/v1/onboarding"), "/onboarding");
        assert_eq!(return_path("/api/v1/dashboard"), "/dashboard");
        assert_eq!(return_path("/api/v1"), "/");
        assert_eq!(return_path("/health"), "/");
    }
}
