//! Conditional visibility of questionnaire items.
//!
//! A question with `conditional_on = P` is shown only when P has been answered:
//! for a `yes_no` parent the answer must be exactly `"yes"`, for any other parent
//! type any non-empty answer counts. Only the direct parent is consulted, so a
//! chain of conditionals is resolved one hop at a time as the user answers.

use super::models::{Question, QuestionType, ResponseMap};

pub const YES: &str = "yes";

/// Result of resolving a question's `conditional_on` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLookup<'a> {
    Found(&'a Question),
    NotFound,
}

pub fn lookup_parent<'a>(parent_id: i32, all_questions: &'a [Question]) -> ParentLookup<'a> {
    match all_questions.iter().find(|q| q.id == parent_id) {
        Some(parent) => ParentLookup::Found(parent),
        None => ParentLookup::NotFound,
    }
}

pub fn should_show(question: &Question, all_questions: &[Question], responses: &ResponseMap) -> bool {
    let Some(parent_id) = question.conditional_on else {
        return true;
    };

    match lookup_parent(parent_id, all_questions) {
        // A dangling reference shows the question rather than hiding it forever.
        ParentLookup::NotFound => true,
        ParentLookup::Found(parent) if parent.question_type == QuestionType::YesNo => {
            responses.get(&parent.id).is_some_and(|answer| answer == YES)
        }
        ParentLookup::Found(parent) => responses
            .get(&parent.id)
            .is_some_and(|answer| !answer.is_empty()),
    }
}
