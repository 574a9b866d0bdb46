use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::extractor::CurrentUser;
use super::validation::{normalize_email, validate_signup};
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::models::user::AuthUser;
use crate::questionnaire::flow::DASHBOARD_PATH;
use crate::state::AppState;
use crate::store::StoreError;

pub const INITIAL_SETUP_PATH: &str = "/initial-setup";
pub const LOGIN_PATH: &str = "/login";

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub user: AuthUser,
    pub redirect: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub user_id: Uuid,
    pub redirect: String,
}

/// Where a freshly signed-in user goes next.
pub fn post_login_redirect(onboarding_completed: bool) -> &'static str {
    if onboarding_completed {
        DASHBOARD_PATH
    } else {
        INITIAL_SETUP_PATH
    }
}

/// POST /api/v1/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let email = validate_signup(&req.email, &req.password)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let user = state
        .auth
        .sign_up(&email, &req.password, name)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict(
                "This email is already registered. Please log in instead.".to_string(),
            ),
            other => AppError::Store(other),
        })?;

    let profile = Profile {
        id: user.id,
        name: user.display_name(),
        email: user.email.clone(),
        onboarding_completed: false,
    };
    if let Err(e) = state.store.insert_profile(&profile).await {
        error!("Account created but profile setup failed for {}: {e}", user.id);
        if let Err(cleanup) = state.auth.delete_user(user.id).await {
            error!("Failed to remove half-created user {}: {cleanup}", user.id);
        }
        return Err(AppError::Internal(anyhow::anyhow!(
            "Account created but profile setup failed: {e}"
        )));
    }

    info!("User signed up: {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user,
            redirect: LOGIN_PATH.to_string(),
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = normalize_email(&req.email);
    let session = state.auth.sign_in(&email, &req.password).await?;

    let completed = match state.store.get_profile(session.user_id).await {
        Ok(profile) => profile.is_some_and(|p| p.onboarding_completed),
        Err(e) => {
            error!("Failed to load profile after login for {}: {e}", session.user_id);
            false
        }
    };

    Ok(Json(LoginResponse {
        token: session.token,
        user_id: session.user_id,
        redirect: post_login_redirect(completed).to_string(),
    }))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, AppError> {
    state.auth.sign_out(current.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
