use super::models::Question;

const BUNDLED_QUESTIONNAIRE: &str = include_str!("../../data/questionnaire.json");

/// The questionnaire shipped with the service, ordered by id. Used to seed the store.
pub fn bundled_questionnaire() -> Result<Vec<Question>, serde_json::Error> {
    let mut questions: Vec<Question> = serde_json::from_str(BUNDLED_QUESTIONNAIRE)?;
    questions.sort_by_key(|q| q.id);
    Ok(questions)
}
