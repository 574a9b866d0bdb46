use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{AuthProvider, DataStore, StoreError};
use crate::auth::password::{hash_password, verify_password};
use crate::models::chat::{ChatMessageRow, ChatRole};
use crate::models::profile::{NeedsUpdate, Preferences, Profile};
use crate::models::user::{AuthUser, Session, UserRow};
use crate::questionnaire::models::{Question, QuestionOption, QuestionType, UserResponse};

/// Postgres-backed store. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct QuestionRow {
    id: i32,
    category: String,
    question: String,
    required: bool,
    #[sqlx(rename = "type")]
    question_type: String,
    conditional_on: Option<i32>,
}

#[derive(FromRow)]
struct OptionRow {
    question_id: i32,
    option_value: String,
    option_text: String,
}

#[derive(FromRow)]
struct ResponseRow {
    question_id: i32,
    response: String,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the bundled questionnaire. Rows that already exist are left untouched.
    pub async fn seed_questionnaire(&self, questions: &[Question]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Parents first so `conditional_on` references resolve.
        for q in questions {
            sqlx::query(
                r#"
                INSERT INTO questionnaire (id, category, question, required, type, conditional_on)
                VALUES ($1, $2, $3, $4, $5, NULL)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(q.id)
            .bind(&q.category)
            .bind(&q.question)
            .bind(q.required)
            .bind(q.question_type.as_str())
            .execute(&mut *tx)
            .await?;
        }

        for q in questions.iter().filter(|q| q.conditional_on.is_some()) {
            sqlx::query(
                "UPDATE questionnaire SET conditional_on = $1 WHERE id = $2 AND conditional_on IS NULL",
            )
            .bind(q.conditional_on)
            .bind(q.id)
            .execute(&mut *tx)
            .await?;
        }

        for q in questions {
            for (position, option) in q.options.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO question_options (question_id, option_value, option_text, position)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (question_id, option_value) DO NOTHING
                    "#,
                )
                .bind(q.id)
                .bind(&option.option_value)
                .bind(&option.option_text)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!("Questionnaire seeded ({} questions)", questions.len());
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for PgStore {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthUser, StoreError> {
        let password_hash =
            hash_password(password).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let user: AuthUser = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, password_hash, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        debug!("Created user {}", user.id);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, password_hash, name FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        let row = row.ok_or(StoreError::InvalidCredentials)?;

        let matches = verify_password(password, &row.password_hash)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !matches {
            return Err(StoreError::InvalidCredentials);
        }

        let session: Session = sqlx::query_as(
            "INSERT INTO sessions (token, user_id) VALUES ($1, $2) RETURNING token, user_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(row.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn sign_out(&self, token: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_session(&self, token: Uuid) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as("SELECT token, user_id, created_at FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn get_user(&self, token: Uuid) -> Result<Option<AuthUser>, StoreError> {
        let user = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.name
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        // Sessions and dependent rows cascade.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("User {user_id} not found")));
        }
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, StoreError> {
        let user = sqlx::query_as("SELECT id, email, name FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let profile = sqlx::query_as(
            "SELECT id, name, email, onboarding_completed FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (id, name, email, onboarding_completed) VALUES ($1, $2, $3, $4)",
        )
        .bind(profile.id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(profile.onboarding_completed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_onboarding_completed(
        &self,
        user_id: Uuid,
        completed: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE profiles SET onboarding_completed = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(completed)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Profile {user_id} not found")));
        }
        Ok(())
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let profile = sqlx::query_as(
            "SELECT id, name, email, onboarding_completed FROM profiles WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Option<Preferences>, StoreError> {
        let prefs = sqlx::query_as(
            r#"
            SELECT user_id, language, location, housing_status, food_security,
                   healthcare_needs, has_children, immigration_status, zip_code
            FROM preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prefs)
    }

    async fn upsert_preferences(&self, p: &Preferences) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO preferences
                (user_id, language, location, housing_status, food_security,
                 healthcare_needs, has_children, immigration_status, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                language = EXCLUDED.language,
                location = EXCLUDED.location,
                housing_status = EXCLUDED.housing_status,
                food_security = EXCLUDED.food_security,
                healthcare_needs = EXCLUDED.healthcare_needs,
                has_children = EXCLUDED.has_children,
                immigration_status = EXCLUDED.immigration_status,
                zip_code = EXCLUDED.zip_code,
                updated_at = NOW()
            "#,
        )
        .bind(p.user_id)
        .bind(&p.language)
        .bind(&p.location)
        .bind(&p.housing_status)
        .bind(&p.food_security)
        .bind(&p.healthcare_needs)
        .bind(p.has_children)
        .bind(&p.immigration_status)
        .bind(&p.zip_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_needs(&self, user_id: Uuid, needs: &NeedsUpdate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO preferences (user_id, housing_status, has_children, healthcare_needs)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                housing_status = EXCLUDED.housing_status,
                has_children = EXCLUDED.has_children,
                healthcare_needs = EXCLUDED.healthcare_needs,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&needs.housing_status)
        .bind(needs.has_children)
        .bind(&needs.healthcare_needs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_responses(&self, user_id: Uuid) -> Result<Vec<UserResponse>, StoreError> {
        let rows: Vec<ResponseRow> = sqlx::query_as(
            "SELECT question_id, response FROM user_responses WHERE user_id = $1 ORDER BY question_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| UserResponse {
                question_id: r.question_id,
                response: r.response,
            })
            .collect())
    }

    async fn upsert_responses(
        &self,
        user_id: Uuid,
        responses: &[UserResponse],
    ) -> Result<(), StoreError> {
        if responses.is_empty() {
            return Ok(());
        }

        // One statement cannot touch the same conflict key twice, so collapse duplicates first.
        let latest: BTreeMap<i32, String> = responses
            .iter()
            .map(|r| (r.question_id, r.response.clone()))
            .collect();
        let (question_ids, answers): (Vec<i32>, Vec<String>) = latest.into_iter().unzip();

        sqlx::query(
            r#"
            INSERT INTO user_responses (user_id, question_id, response)
            SELECT $1, q, r FROM UNNEST($2::INTEGER[], $3::TEXT[]) AS t (q, r)
            ON CONFLICT (user_id, question_id) DO UPDATE SET
                response = EXCLUDED.response,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&question_ids)
        .bind(&answers)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_questionnaire(&self) -> Result<Vec<Question>, StoreError> {
        let rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT id, category, question, required, type, conditional_on FROM questionnaire ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let options: Vec<OptionRow> = sqlx::query_as(
            "SELECT question_id, option_value, option_text FROM question_options ORDER BY question_id, position, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: BTreeMap<i32, Vec<QuestionOption>> = BTreeMap::new();
        for o in options {
            by_question.entry(o.question_id).or_default().push(QuestionOption {
                option_value: o.option_value,
                option_text: o.option_text,
            });
        }

        Ok(rows
            .into_iter()
            .map(|r| Question {
                options: by_question.remove(&r.id).unwrap_or_default(),
                id: r.id,
                category: r.category,
                question: r.question,
                required: r.required,
                question_type: QuestionType::parse(&r.question_type),
                conditional_on: r.conditional_on,
            })
            .collect())
    }

    async fn latest_conversation(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM chat_conversations
            WHERE user_id = $1
            ORDER BY last_message_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id.map(|(id,)| id))
    }

    async fn create_conversation(&self, user_id: Uuid) -> Result<Uuid, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO chat_conversations (id, user_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn touch_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE chat_conversations SET last_message_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_chat_message(
        &self,
        conversation_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessageRow, StoreError> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO chat_messages (id, conversation_id, role, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, role, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessageRow>, StoreError> {
        let rows = sqlx::query_as(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM chat_messages
            WHERE conversation_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_user_data(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for statement in [
            "DELETE FROM user_responses WHERE user_id = $1",
            "DELETE FROM preferences WHERE user_id = $1",
            "DELETE FROM chat_conversations WHERE user_id = $1",
            "DELETE FROM profiles WHERE id = $1",
        ] {
            sqlx::query(statement).bind(user_id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
