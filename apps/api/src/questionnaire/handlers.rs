use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::flow::{OnboardingFlow, OnboardingState, Step};
use super::models::{responses_to_map, Question, ResponseMap};
use super::onboarding::{complete_onboarding, sync_preferences_from_answers, CompletionOutcome};
use crate::auth::extractor::CurrentUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StepView {
    pub index: usize,
    pub title: String,
    /// `None` for the confirmation step.
    pub category: Option<String>,
    pub questions: Vec<Question>,
}

#[derive(Serialize)]
pub struct OnboardingView {
    #[serde(flatten)]
    pub state: OnboardingState,
    pub steps: Vec<StepView>,
    pub responses: ResponseMap,
    pub progress_percent: u8,
}

#[derive(Deserialize)]
pub struct ValidateStepRequest {
    pub step: usize,
    #[serde(default)]
    pub responses: ResponseMap,
}

#[derive(Serialize)]
pub struct ValidateStepResponse {
    pub step: usize,
    pub visible_question_ids: Vec<i32>,
    pub missing_required: Vec<i32>,
    pub can_advance: bool,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub responses: ResponseMap,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    #[serde(flatten)]
    pub state: OnboardingState,
    pub saved_responses: usize,
}

fn step_views(flow: &OnboardingFlow) -> Vec<StepView> {
    flow.step_titles()
        .into_iter()
        .enumerate()
        .map(|(index, title)| {
            let (category, questions) = match flow.step(index) {
                Some(Step::Category(category)) => (
                    Some(category.to_string()),
                    flow.questions()
                        .iter()
                        .filter(|q| q.category == category)
                        .cloned()
                        .collect(),
                ),
                _ => (None, Vec::new()),
            };
            StepView {
                index,
                title,
                category,
                questions,
            }
        })
        .collect()
}

/// GET /api/v1/questionnaire
pub async fn handle_get_questionnaire(
    State(state): State<AppState>,
) -> Result<Json<Vec<Question>>, AppError> {
    Ok(Json(state.store.get_questionnaire().await?))
}

/// GET /api/v1/onboarding
pub async fn handle_get_onboarding(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<OnboardingView>, AppError> {
    let completed = state
        .store
        .get_profile(current.user.id)
        .await?
        .is_some_and(|p| p.onboarding_completed);

    let questions = state.store.get_questionnaire().await?;
    let saved = state.store.get_responses(current.user.id).await?;
    let flow = OnboardingFlow::new(questions).with_responses(responses_to_map(&saved));

    let state = if completed {
        OnboardingState::done()
    } else {
        flow.state().clone()
    };

    Ok(Json(OnboardingView {
        state,
        steps: step_views(&flow),
        responses: flow.responses().clone(),
        progress_percent: flow.progress_percent(),
    }))
}

/// POST /api/v1/onboarding/validate
pub async fn handle_validate_step(
    State(state): State<AppState>,
    Json(req): Json<ValidateStepRequest>,
) -> Result<Json<ValidateStepResponse>, AppError> {
    let questions = state.store.get_questionnaire().await?;
    let flow = OnboardingFlow::new(questions).with_responses(req.responses);

    if flow.step(req.step).is_none() {
        return Err(AppError::Validation(format!(
            "Step {} does not exist ({} steps)",
            req.step,
            flow.step_count()
        )));
    }

    let missing_required = flow.missing_required(req.step);
    Ok(Json(ValidateStepResponse {
        step: req.step,
        visible_question_ids: flow.visible_questions(req.step).iter().map(|q| q.id).collect(),
        can_advance: missing_required.is_empty(),
        missing_required,
    }))
}

/// POST /api/v1/onboarding/complete
pub async fn handle_complete_onboarding(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    let questions = state.store.get_questionnaire().await?;
    let mut flow = OnboardingFlow::new(questions).with_responses(req.responses);

    let unknown = flow.unknown_question_ids();
    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "Responses reference unknown questions: {unknown:?}"
        )));
    }

    flow.validate_all()?;
    flow.advance_to_confirmation()?;
    let rows = flow.begin_submit()?;

    let CompletionOutcome {
        saved_responses, ..
    } = complete_onboarding(state.store.as_ref(), current.user.id, &rows).await?;

    if let Err(e) =
        sync_preferences_from_answers(state.store.as_ref(), current.user.id, flow.responses()).await
    {
        warn!(
            "Onboarding completed but preferences were not updated for {}: {e}",
            current.user.id
        );
    }

    let state = flow.finish::<String>(Ok(())).clone();
    Ok(Json(CompleteResponse {
        state,
        saved_responses,
    }))
}
