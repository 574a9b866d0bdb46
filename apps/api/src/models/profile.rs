use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `profiles` row. Created at sign-up; `onboarding_completed` flips once when onboarding finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub onboarding_completed: bool,
}

/// `preferences` row, one per user (upsert key `user_id`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Preferences {
    pub user_id: Uuid,
    pub language: Option<String>,
    pub location: Option<String>,
    pub housing_status: Option<String>,
    pub food_security: Option<String>,
    #[serde(default)]
    pub healthcare_needs: Vec<String>,
    #[serde(default)]
    pub has_children: bool,
    pub immigration_status: Option<String>,
    pub zip_code: Option<String>,
}

impl Preferences {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}

/// Partial update written by the needs assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedsUpdate {
    pub housing_status: String,
    pub has_children: bool,
    #[serde(default)]
    pub healthcare_needs: Vec<String>,
}
