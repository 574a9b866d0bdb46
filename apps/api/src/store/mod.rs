//! Account & Data Store.
//!
//! Two object-safe traits describe everything the service needs from its backing
//! store: [`AuthProvider`] for accounts and sessions, [`DataStore`] for
//! table-style reads and writes. `main` constructs exactly one implementation per
//! process and shares it through `AppState`; nothing else opens connections.
//!
//! Implementations:
//! - [`postgres::PgStore`]: sqlx over Postgres.
//! - [`memory::MemoryStore`]: in-process maps, used when no database is configured and in tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::chat::{ChatMessageRow, ChatRole};
use crate::models::profile::{NeedsUpdate, Preferences, Profile};
use crate::models::user::{AuthUser, Session};
use crate::questionnaire::models::{Question, UserResponse};

pub mod memory;
pub mod postgres;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// A write referenced a row that does not exist, e.g. an unknown question id.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                StoreError::InvalidReference(db.message().to_string())
            }
            _ => StoreError::Unavailable(e.to_string()),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account. `email` is expected to be normalised already.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthUser, StoreError>;

    /// Verifies credentials and opens a new session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StoreError>;

    /// Revokes a session. Unknown tokens are ignored.
    async fn sign_out(&self, token: Uuid) -> Result<(), StoreError>;

    async fn get_session(&self, token: Uuid) -> Result<Option<Session>, StoreError>;

    /// The account behind a session token, if the session is still open.
    async fn get_user(&self, token: Uuid) -> Result<Option<AuthUser>, StoreError>;

    /// Removes the account and every session it holds.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, StoreError>;
}

#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Idempotent: setting the flag to its current value is a no-op apart from `updated_at`.
    async fn set_onboarding_completed(
        &self,
        user_id: Uuid,
        completed: bool,
    ) -> Result<(), StoreError>;

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;

    async fn get_preferences(&self, user_id: Uuid) -> Result<Option<Preferences>, StoreError>;

    /// Upsert keyed by `user_id`.
    async fn upsert_preferences(&self, preferences: &Preferences) -> Result<(), StoreError>;

    /// Writes only the needs-assessment columns, creating the row if needed.
    async fn update_needs(&self, user_id: Uuid, needs: &NeedsUpdate) -> Result<(), StoreError>;

    async fn get_responses(&self, user_id: Uuid) -> Result<Vec<UserResponse>, StoreError>;

    /// Upsert keyed by `(user_id, question_id)`. Later rows for the same question win.
    async fn upsert_responses(
        &self,
        user_id: Uuid,
        responses: &[UserResponse],
    ) -> Result<(), StoreError>;

    /// Questions ordered by id, options attached in display order.
    async fn get_questionnaire(&self) -> Result<Vec<Question>, StoreError>;

    /// Most recently active conversation of a user.
    async fn latest_conversation(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    async fn create_conversation(&self, user_id: Uuid) -> Result<Uuid, StoreError>;

    /// Bumps `last_message_at` to now.
    async fn touch_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError>;

    async fn insert_chat_message(
        &self,
        conversation_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessageRow, StoreError>;

    /// Messages of one conversation, oldest first.
    async fn conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessageRow>, StoreError>;

    /// Deletes responses, preferences, conversations and the profile of a user.
    async fn delete_user_data(&self, user_id: Uuid) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_pool_errors_map_to_unavailable() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
