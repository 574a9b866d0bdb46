use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::service::{load_user_profile, UserProfile, DEFAULT_LANGUAGE};
use crate::auth::extractor::CurrentUser;
use crate::errors::AppError;
use crate::models::profile::{NeedsUpdate, Preferences, Profile};
use crate::questionnaire::models::{unknown_question_ids, UserResponse};
use crate::resources::models::{location_name, DEFAULT_LOCATION};
use crate::state::AppState;

pub const DEMO_EMAIL: &str = "hofhackathon@nyu.edu";
pub const DEMO_NAME: &str = "HOF Hackathon";
pub const DEMO_PASSWORD: &str = "HelloWorld";

/// Fields a user may change on the preferences page. Omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub language: Option<String>,
    pub location: Option<String>,
    pub housing_status: Option<String>,
    pub food_security: Option<String>,
    pub healthcare_needs: Option<Vec<String>>,
    pub has_children: Option<bool>,
    pub immigration_status: Option<String>,
    pub zip_code: Option<String>,
}

impl PreferencesUpdate {
    pub fn apply(self, prefs: &mut Preferences) {
        if self.language.is_some() {
            prefs.language = self.language;
        }
        if self.location.is_some() {
            prefs.location = self.location;
        }
        if self.housing_status.is_some() {
            prefs.housing_status = self.housing_status;
        }
        if self.food_security.is_some() {
            prefs.food_security = self.food_security;
        }
        if let Some(needs) = self.healthcare_needs {
            prefs.healthcare_needs = needs;
        }
        if let Some(has_children) = self.has_children {
            prefs.has_children = has_children;
        }
        if self.immigration_status.is_some() {
            prefs.immigration_status = self.immigration_status;
        }
        if self.zip_code.is_some() {
            prefs.zip_code = self.zip_code;
        }
    }
}

#[derive(Deserialize)]
pub struct ResponsesUpdate {
    pub responses: Vec<UserResponse>,
}

#[derive(Serialize)]
pub struct ResponsesSaved {
    pub saved_responses: usize,
}

#[derive(Serialize)]
pub struct MockUserResponse {
    pub user_id: Uuid,
    pub email: &'static str,
    pub created: bool,
    pub message: &'static str,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Json<UserProfile> {
    Json(load_user_profile(state.store.as_ref(), Some(&current.user)).await)
}

/// PUT /api/v1/preferences
pub async fn handle_update_preferences(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    if let Some(location) = update.location.as_deref() {
        if location_name(location).is_none() {
            return Err(AppError::Validation(format!("Unknown location '{location}'")));
        }
    }

    let user_id = current.user.id;
    let mut prefs = state
        .store
        .get_preferences(user_id)
        .await?
        .unwrap_or_else(|| Preferences::new(user_id));
    update.apply(&mut prefs);
    state.store.upsert_preferences(&prefs).await?;

    Ok(Json(load_user_profile(state.store.as_ref(), Some(&current.user)).await))
}

/// PUT /api/v1/needs
pub async fn handle_update_needs(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(needs): Json<NeedsUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    if needs.housing_status.trim().is_empty() {
        return Err(AppError::Validation(
            "Please select your housing status".to_string(),
        ));
    }
    state.store.update_needs(current.user.id, &needs).await?;
    Ok(Json(load_user_profile(state.store.as_ref(), Some(&current.user)).await))
}

/// PUT /api/v1/profile/responses
pub async fn handle_update_responses(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ResponsesUpdate>,
) -> Result<Json<ResponsesSaved>, AppError> {
    let responses: Vec<UserResponse> = req
        .responses
        .into_iter()
        .filter(|r| !r.response.is_empty())
        .collect();

    let questions = state.store.get_questionnaire().await?;
    let unknown = unknown_question_ids(&questions, responses.iter().map(|r| r.question_id));
    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "Responses reference unknown questions: {unknown:?}"
        )));
    }

    state
        .store
        .upsert_responses(current.user.id, &responses)
        .await?;
    Ok(Json(ResponsesSaved {
        saved_responses: responses.len(),
    }))
}

/// DELETE /api/v1/account
pub async fn handle_delete_account(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, AppError> {
    let user_id = current.user.id;
    state.store.delete_user_data(user_id).await?;
    state.auth.delete_user(user_id).await?;
    info!("Deleted account {user_id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/mock-user
/// Creates the demo account, or resets its onboarding if it already exists.
pub async fn handle_create_mock_user(
    State(state): State<AppState>,
) -> Result<Json<MockUserResponse>, AppError> {
    if !state.config.enable_demo_tools {
        return Err(AppError::NotFound("Demo tools are disabled".to_string()));
    }

    if let Some(existing) = state.store.find_profile_by_email(DEMO_EMAIL).await? {
        info!("Mock user already exists, resetting onboarding status");
        state.store.set_onboarding_completed(existing.id, false).await?;
        return Ok(Json(MockUserResponse {
            user_id: existing.id,
            email: DEMO_EMAIL,
            created: false,
            message: "Mock user already exists, reset onboarding status",
        }));
    }

    let user = state
        .auth
        .sign_up(DEMO_EMAIL, DEMO_PASSWORD, Some(DEMO_NAME))
        .await?;
    state
        .store
        .insert_profile(&Profile {
            id: user.id,
            name: DEMO_NAME.to_string(),
            email: DEMO_EMAIL.to_string(),
            onboarding_completed: false,
        })
        .await?;

    let prefs = Preferences {
        language: Some(DEFAULT_LANGUAGE.to_string()),
        location: Some(DEFAULT_LOCATION.to_string()),
        ..Preferences::new(user.id)
    };
    if let Err(e) = state.store.upsert_preferences(&prefs).await {
        warn!("Error creating preferences for mock user: {e}");
    }

    Ok(Json(MockUserResponse {
        user_id: user.id,
        email: DEMO_EMAIL,
        created: true,
        message: "Mock user created successfully",
    }))
}
