//! Onboarding completion saga.
//!
//! Two separate writes, in order:
//! 1. upsert the non-empty answers keyed by `(user_id, question_id)`
//! 2. set `onboarding_completed = true`
//!
//! There is no transaction across them. If phase 1 fails the flag is never
//! touched. If phase 2 fails the answers stay saved and the whole saga can be
//! rerun: both writes are idempotent.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::flow::DASHBOARD_PATH;
use super::models::{ResponseMap, UserResponse};
use super::visibility::YES;
use crate::models::profile::Preferences;
use crate::store::{DataStore, StoreError};

pub const CHILDREN_QUESTION_ID: i32 = 3;
pub const IMMIGRATION_STATUS_QUESTION_ID: i32 = 6;
pub const HOUSING_STATUS_QUESTION_ID: i32 = 14;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("Failed to save your responses: {0}")]
    ResponsesNotSaved(StoreError),

    #[error("Your responses were saved but onboarding could not be marked complete: {0}")]
    FlagNotSet(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub saved_responses: usize,
    pub redirect: String,
}

/// The two writes the saga performs.
#[async_trait]
pub trait OnboardingWriter: Send + Sync {
    async fn save_responses(
        &self,
        user_id: Uuid,
        responses: &[UserResponse],
    ) -> Result<(), StoreError>;

    async fn mark_completed(&self, user_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: DataStore + ?Sized> OnboardingWriter for T {
    async fn save_responses(
        &self,
        user_id: Uuid,
        responses: &[UserResponse],
    ) -> Result<(), StoreError> {
        self.upsert_responses(user_id, responses).await
    }

    async fn mark_completed(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.set_onboarding_completed(user_id, true).await
    }
}

pub async fn complete_onboarding<W: OnboardingWriter + ?Sized>(
    writer: &W,
    user_id: Uuid,
    responses: &[UserResponse],
) -> Result<CompletionOutcome, CompletionError> {
    let to_save: Vec<UserResponse> = responses
        .iter()
        .filter(|r| !r.response.is_empty())
        .cloned()
        .collect();

    writer
        .save_responses(user_id, &to_save)
        .await
        .map_err(|e| {
            error!("Onboarding responses not saved for {user_id}: {e}");
            CompletionError::ResponsesNotSaved(e)
        })?;

    writer.mark_completed(user_id).await.map_err(|e| {
        error!("Onboarding flag not set for {user_id} ({} responses saved): {e}", to_save.len());
        CompletionError::FlagNotSet(e)
    })?;

    info!("Onboarding completed for {user_id} ({} responses)", to_save.len());
    Ok(CompletionOutcome {
        saved_responses: to_save.len(),
        redirect: DASHBOARD_PATH.to_string(),
    })
}

/// Copies answers that have a preferences column onto `prefs`.
/// Unanswered questions leave the stored value alone.
pub fn apply_answers_to_preferences(prefs: &mut Preferences, answers: &ResponseMap) {
    let answer = |id: i32| answers.get(&id).filter(|a| !a.is_empty());

    if let Some(housing) = answer(HOUSING_STATUS_QUESTION_ID) {
        prefs.housing_status = Some(housing.clone());
    }
    if let Some(children) = answer(CHILDREN_QUESTION_ID) {
        prefs.has_children = children == YES;
    }
    if let Some(status) = answer(IMMIGRATION_STATUS_QUESTION_ID) {
        prefs.immigration_status = Some(status.clone());
    }
}

/// Writes the answer-derived preferences for `user_id`. Runs after the saga and
/// is not part of it: the answers and flag are already saved when this is called.
pub async fn sync_preferences_from_answers(
    store: &dyn DataStore,
    user_id: Uuid,
    answers: &ResponseMap,
) -> Result<(), StoreError> {
    let mut prefs = store
        .get_preferences(user_id)
        .await?
        .unwrap_or_else(|| Preferences::new(user_id));
    apply_answers_to_preferences(&mut prefs, answers);
    store.upsert_preferences(&prefs).await
}
