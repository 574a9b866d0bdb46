//! Profile projection: stored profile + preferences + responses folded into the
//! one view the dashboard, chat and profile page read from.

use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::profile::{Preferences, Profile};
use crate::models::user::AuthUser;
use crate::questionnaire::models::UserResponse;
use crate::resources::models::DEFAULT_LOCATION;
use crate::resources::relevance::UserNeeds;
use crate::store::DataStore;

pub const DEFAULT_HOUSING_STATUS: &str = "stable";
pub const DEFAULT_FOOD_SECURITY: &str = "never";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const GUEST_NAME: &str = "Guest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub is_guest: bool,
    pub onboarding_completed: bool,
    pub language: String,
    pub location: String,
    pub housing_status: String,
    pub food_security: String,
    pub healthcare_needs: Vec<String>,
    pub has_children: bool,
    pub immigration_status: String,
    pub zip_code: String,
    pub responses: Vec<UserResponse>,
}

impl UserProfile {
    pub fn guest() -> Self {
        Self {
            id: None,
            name: GUEST_NAME.to_string(),
            email: String::new(),
            is_guest: true,
            onboarding_completed: false,
            language: DEFAULT_LANGUAGE.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            housing_status: DEFAULT_HOUSING_STATUS.to_string(),
            food_security: DEFAULT_FOOD_SECURITY.to_string(),
            healthcare_needs: Vec::new(),
            has_children: false,
            immigration_status: String::new(),
            zip_code: String::new(),
            responses: Vec::new(),
        }
    }

    fn project(
        user: &AuthUser,
        profile: Option<Profile>,
        prefs: Option<Preferences>,
        responses: Vec<UserResponse>,
    ) -> Self {
        let prefs = prefs.unwrap_or_else(|| Preferences::new(user.id));
        let or_default = |value: Option<String>, default: &str| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let (name, onboarding_completed) = match profile {
            Some(p) if !p.name.trim().is_empty() => (p.name, p.onboarding_completed),
            Some(p) => (user.display_name(), p.onboarding_completed),
            None => (user.display_name(), false),
        };

        Self {
            id: Some(user.id),
            name,
            email: user.email.clone(),
            is_guest: false,
            onboarding_completed,
            language: or_default(prefs.language, DEFAULT_LANGUAGE),
            location: or_default(prefs.location, DEFAULT_LOCATION),
            housing_status: or_default(prefs.housing_status, DEFAULT_HOUSING_STATUS),
            food_security: or_default(prefs.food_security, DEFAULT_FOOD_SECURITY),
            healthcare_needs: prefs.healthcare_needs,
            has_children: prefs.has_children,
            immigration_status: prefs.immigration_status.unwrap_or_default(),
            zip_code: prefs.zip_code.unwrap_or_default(),
            responses,
        }
    }
}

impl UserNeeds {
    /// `None` for guests, so the engine falls back to static priorities.
    pub fn from_profile(profile: &UserProfile) -> Option<Self> {
        if profile.is_guest {
            return None;
        }
        Some(Self {
            housing_status: profile.housing_status.clone(),
            food_security: profile.food_security.clone(),
            healthcare_needs: profile.healthcare_needs.clone(),
            immigration_status: profile.immigration_status.clone(),
            has_children: profile.has_children,
            responses: profile.responses.clone(),
            location: profile.location.clone(),
        })
    }
}

/// Loads the profile view for `user`. Never fails: a missing user yields the guest
/// profile, and read failures are logged and replaced by defaults.
pub async fn load_user_profile(store: &dyn DataStore, user: Option<&AuthUser>) -> UserProfile {
    let Some(user) = user else {
        return UserProfile::guest();
    };

    let profile = match store.get_profile(user.id).await {
        Ok(profile) => profile,
        Err(e) => {
            error!("Failed to load profile for {}: {e}", user.id);
            return UserProfile::guest();
        }
    };

    let prefs = store.get_preferences(user.id).await.unwrap_or_else(|e| {
        warn!("Failed to load preferences for {}: {e}", user.id);
        None
    });

    let responses = store.get_responses(user.id).await.unwrap_or_else(|e| {
        warn!("Failed to load responses for {}: {e}", user.id);
        Vec::new()
    });

    UserProfile::project(user, profile, prefs, responses)
}
