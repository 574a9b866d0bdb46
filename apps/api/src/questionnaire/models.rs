use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Select,
    Text,
    Number,
    YesNo,
    MultiText,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Select => "select",
            QuestionType::Text => "text",
            QuestionType::Number => "number",
            QuestionType::YesNo => "yes_no",
            QuestionType::MultiText => "multi_text",
        }
    }

    /// Parses the stored column value. Unknown values render as free text.
    pub fn parse(value: &str) -> Self {
        match value {
            "select" => QuestionType::Select,
            "number" => QuestionType::Number,
            "yes_no" => QuestionType::YesNo,
            "multi_text" => QuestionType::MultiText,
            _ => QuestionType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub option_value: String,
    pub option_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i32,
    pub category: String,
    pub question: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub conditional_on: Option<i32>,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

/// One answer; persisted with upsert key `(user_id, question_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub question_id: i32,
    pub response: String,
}

/// Answers keyed by question id, as held by the flow while the user edits them.
pub type ResponseMap = BTreeMap<i32, String>;

/// Folds a response list into a map. Later entries for the same question win.
pub fn responses_to_map(responses: &[UserResponse]) -> ResponseMap {
    responses
        .iter()
        .map(|r| (r.question_id, r.response.clone()))
        .collect()
}

/// Flattens a map into persistable rows, dropping empty answers.
pub fn map_to_responses(map: &ResponseMap) -> Vec<UserResponse> {
    map.iter()
        .filter(|(_, response)| !response.is_empty())
        .map(|(question_id, response)| UserResponse {
            question_id: *question_id,
            response: response.clone(),
        })
        .collect()
}

/// Ids from `ids` that name no question in `questions`, in input order.
pub fn unknown_question_ids(
    questions: &[Question],
    ids: impl IntoIterator<Item = i32>,
) -> Vec<i32> {
    ids.into_iter()
        .filter(|id| !questions.iter().any(|q| q.id == *id))
        .collect()
}
