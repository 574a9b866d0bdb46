//! Onboarding flow: the multi-step questionnaire state machine.
//!
//! States: `loading → {needs_login, in_progress(step), confirmation, submitting, done, error}`.
//!
//! Steps are the questionnaire categories in first-seen order followed by one
//! synthetic confirmation step. Advancing past a category requires every
//! required, currently visible question in it to have a non-empty answer.
//! Going back is always allowed and never revalidates.

use serde::Serialize;
use thiserror::Error;

use super::models::{map_to_responses, unknown_question_ids, Question, ResponseMap, UserResponse};
use super::visibility::should_show;
use crate::errors::login_redirect;

pub const ONBOARDING_PATH: &str = "/onboarding";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const CONFIRMATION_TITLE: &str = "Confirmation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OnboardingState {
    Loading,
    NeedsLogin { redirect: String },
    InProgress { step: usize },
    Confirmation,
    Submitting,
    Done { redirect: String },
    Error { message: String },
}

impl OnboardingState {
    /// Terminal state for a visitor without a session.
    pub fn needs_login() -> Self {
        OnboardingState::NeedsLogin {
            redirect: login_redirect(ONBOARDING_PATH),
        }
    }

    pub fn done() -> Self {
        OnboardingState::Done {
            redirect: DASHBOARD_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Please answer all required questions before continuing (step {step}: {question_ids:?})")]
    MissingRequired { step: usize, question_ids: Vec<i32> },

    #[error("Responses can only be submitted from the confirmation step")]
    NotAtConfirmation,

    #[error("A submission is already in progress")]
    AlreadySubmitting,
}

/// A category step or the trailing confirmation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    Category(&'a str),
    Confirmation,
}

/// Unique categories in the order they first appear in the catalog.
pub fn categories_in_order(questions: &[Question]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for q in questions {
        if !categories.iter().any(|c| c == &q.category) {
            categories.push(q.category.clone());
        }
    }
    categories
}

#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    questions: Vec<Question>,
    categories: Vec<String>,
    current: usize,
    responses: ResponseMap,
    state: OnboardingState,
}

impl OnboardingFlow {
    pub fn new(questions: Vec<Question>) -> Self {
        let categories = categories_in_order(&questions);
        let state = if categories.is_empty() {
            OnboardingState::Confirmation
        } else {
            OnboardingState::InProgress { step: 0 }
        };
        Self {
            questions,
            categories,
            current: 0,
            responses: ResponseMap::new(),
            state,
        }
    }

    /// Starts the flow with previously saved answers filled in.
    pub fn with_responses(mut self, responses: ResponseMap) -> Self {
        self.responses = responses;
        self
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    pub fn state(&self) -> &OnboardingState {
        &self.state
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    /// Category steps plus the confirmation step.
    pub fn step_count(&self) -> usize {
        self.categories.len() + 1
    }

    pub fn step(&self, index: usize) -> Option<Step<'_>> {
        match index.cmp(&self.categories.len()) {
            std::cmp::Ordering::Less => Some(Step::Category(&self.categories[index])),
            std::cmp::Ordering::Equal => Some(Step::Confirmation),
            std::cmp::Ordering::Greater => None,
        }
    }

    pub fn step_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.categories.iter().map(|c| capitalize(c)).collect();
        titles.push(CONFIRMATION_TITLE.to_string());
        titles
    }

    pub fn progress_percent(&self) -> u8 {
        (((self.current + 1) * 100) / self.step_count()).min(100) as u8
    }

    pub fn set_response(&mut self, question_id: i32, value: impl Into<String>) {
        self.responses.insert(question_id, value.into());
    }

    pub fn is_visible(&self, question: &Question) -> bool {
        should_show(question, &self.questions, &self.responses)
    }

    /// Questions of a category step that are currently visible. Empty for the confirmation step.
    pub fn visible_questions(&self, step: usize) -> Vec<&Question> {
        match self.step(step) {
            Some(Step::Category(category)) => self
                .questions
                .iter()
                .filter(|q| q.category == category)
                .filter(|q| self.is_visible(q))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Required, visible questions of `step` with no answer yet.
    pub fn missing_required(&self, step: usize) -> Vec<i32> {
        self.visible_questions(step)
            .into_iter()
            .filter(|q| q.required)
            .filter(|q| self.responses.get(&q.id).map_or(true, |r| r.is_empty()))
            .map(|q| q.id)
            .collect()
    }

    pub fn can_advance(&self) -> bool {
        self.missing_required(self.current).is_empty()
    }

    pub fn next(&mut self) -> Result<&OnboardingState, FlowError> {
        let missing = self.missing_required(self.current);
        if !missing.is_empty() {
            return Err(FlowError::MissingRequired {
                step: self.current,
                question_ids: missing,
            });
        }
        if self.current < self.categories.len() {
            self.current += 1;
        }
        self.state = self.state_for_current();
        Ok(&self.state)
    }

    /// Advances step by step to the confirmation step, stopping at the first incomplete one.
    pub fn advance_to_confirmation(&mut self) -> Result<(), FlowError> {
        while self.state != OnboardingState::Confirmation {
            self.next()?;
        }
        Ok(())
    }

    pub fn back(&mut self) -> &OnboardingState {
        if self.current > 0 {
            self.current -= 1;
        }
        self.state = self.state_for_current();
        &self.state
    }

    /// Answered ids that are not part of this questionnaire.
    pub fn unknown_question_ids(&self) -> Vec<i32> {
        unknown_question_ids(&self.questions, self.responses.keys().copied())
    }

    /// Checks every category step, as a server does before accepting a submission.
    pub fn validate_all(&self) -> Result<(), FlowError> {
        for step in 0..self.categories.len() {
            let missing = self.missing_required(step);
            if !missing.is_empty() {
                return Err(FlowError::MissingRequired {
                    step,
                    question_ids: missing,
                });
            }
        }
        Ok(())
    }

    /// Moves to `submitting` and returns the non-empty answers to persist.
    /// Allowed from the confirmation step and from `error`, which is the retry path.
    pub fn begin_submit(&mut self) -> Result<Vec<UserResponse>, FlowError> {
        match self.state {
            OnboardingState::Confirmation | OnboardingState::Error { .. } => {}
            OnboardingState::Submitting => return Err(FlowError::AlreadySubmitting),
            _ => return Err(FlowError::NotAtConfirmation),
        }
        self.state = OnboardingState::Submitting;
        Ok(map_to_responses(&self.responses))
    }

    /// Records the outcome of the completion saga.
    pub fn finish<E: std::fmt::Display>(&mut self, outcome: Result<(), E>) -> &OnboardingState {
        self.state = match outcome {
            Ok(()) => OnboardingState::done(),
            Err(e) => OnboardingState::Error {
                message: e.to_string(),
            },
        };
        &self.state
    }

    fn state_for_current(&self) -> OnboardingState {
        if self.current >= self.categories.len() {
            OnboardingState::Confirmation
        } else {
            OnboardingState::InProgress { step: self.current }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
