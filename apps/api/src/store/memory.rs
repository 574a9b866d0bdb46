use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthProvider, DataStore, StoreError};
use crate::auth::password::{hash_password, verify_password};
use crate::models::chat::{ChatMessageRow, ChatRole};
use crate::models::profile::{NeedsUpdate, Preferences, Profile};
use crate::models::user::{AuthUser, Session, UserRow};
use crate::questionnaire::models::{Question, UserResponse};

#[derive(Debug, Clone)]
struct Conversation {
    user_id: Uuid,
    last_message_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRow>,
    sessions: HashMap<Uuid, Session>,
    profiles: HashMap<Uuid, Profile>,
    preferences: HashMap<Uuid, Preferences>,
    responses: HashMap<Uuid, BTreeMap<i32, String>>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<ChatMessageRow>,
}

/// Process-local store. Contents are lost on restart.
pub struct MemoryStore {
    questionnaire: Vec<Question>,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new(questionnaire: Vec<Question>) -> Self {
        Self {
            questionnaire,
            tables: RwLock::new(Tables::default()),
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryStore {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthUser, StoreError> {
        let password_hash =
            hash_password(password).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("User {email} already registered")));
        }

        let row = UserRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            name: name.map(str::to_string),
        };
        let user = row.to_auth_user();
        tables.users.insert(row.id, row);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .values()
            .find(|u| u.email == email)
            .ok_or(StoreError::InvalidCredentials)?;

        let matches = verify_password(password, &user.password_hash)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !matches {
            return Err(StoreError::InvalidCredentials);
        }

        let session = Session {
            token: Uuid::new_v4(),
            user_id: user.id,
            created_at: Utc::now(),
        };
        tables.sessions.insert(session.token, session.clone());
        Ok(session)
    }

    async fn sign_out(&self, token: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.sessions.remove(&token);
        Ok(())
    }

    async fn get_session(&self, token: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.read().await.sessions.get(&token).cloned())
    }

    async fn get_user(&self, token: Uuid) -> Result<Option<AuthUser>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(&token)
            .and_then(|s| tables.users.get(&s.user_id))
            .map(UserRow::to_auth_user))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_none() {
            return Err(StoreError::NotFound(format!("User {user_id} not found")));
        }
        tables.sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .map(UserRow::to_auth_user))
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::Conflict(format!(
                "Profile {} already exists",
                profile.id
            )));
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn set_onboarding_completed(
        &self,
        user_id: Uuid,
        completed: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile {user_id} not found")))?;
        profile.onboarding_completed = completed;
        Ok(())
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Option<Preferences>, StoreError> {
        Ok(self.tables.read().await.preferences.get(&user_id).cloned())
    }

    async fn upsert_preferences(&self, preferences: &Preferences) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .preferences
            .insert(preferences.user_id, preferences.clone());
        Ok(())
    }

    async fn update_needs(&self, user_id: Uuid, needs: &NeedsUpdate) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let prefs = tables
            .preferences
            .entry(user_id)
            .or_insert_with(|| Preferences::new(user_id));
        prefs.housing_status = Some(needs.housing_status.clone());
        prefs.has_children = needs.has_children;
        prefs.healthcare_needs = needs.healthcare_needs.clone();
        Ok(())
    }

    async fn get_responses(&self, user_id: Uuid) -> Result<Vec<UserResponse>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .responses
            .get(&user_id)
            .map(|answers| {
                answers
                    .iter()
                    .map(|(question_id, response)| UserResponse {
                        question_id: *question_id,
                        response: response.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_responses(
        &self,
        user_id: Uuid,
        responses: &[UserResponse],
    ) -> Result<(), StoreError> {
        if let Some(unknown) = responses
            .iter()
            .find(|r| !self.questionnaire.iter().any(|q| q.id == r.question_id))
        {
            return Err(StoreError::InvalidReference(format!(
                "Question {} does not exist",
                unknown.question_id
            )));
        }

        let mut tables = self.tables.write().await;
        let answers = tables.responses.entry(user_id).or_default();
        for r in responses {
            answers.insert(r.question_id, r.response.clone());
        }
        Ok(())
    }

    async fn get_questionnaire(&self) -> Result<Vec<Question>, StoreError> {
        Ok(self.questionnaire.clone())
    }

    async fn latest_conversation(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .conversations
            .iter()
            .filter(|(_, c)| c.user_id == user_id)
            .max_by_key(|(_, c)| c.last_message_at)
            .map(|(id, _)| *id))
    }

    async fn create_conversation(&self, user_id: Uuid) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.tables.write().await.conversations.insert(
            id,
            Conversation {
                user_id,
                last_message_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn touch_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let conversation = tables.conversations.get_mut(&conversation_id).ok_or_else(|| {
            StoreError::NotFound(format!("Conversation {conversation_id} not found"))
        })?;
        conversation.last_message_at = Utc::now();
        Ok(())
    }

    async fn insert_chat_message(
        &self,
        conversation_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessageRow, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.conversations.contains_key(&conversation_id) {
            return Err(StoreError::NotFound(format!(
                "Conversation {conversation_id} not found"
            )));
        }
        let row = ChatMessageRow {
            id: Uuid::new_v4(),
            conversation_id,
            role: role.as_str().to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.messages.push(row.clone());
        Ok(row)
    }

    async fn conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessageRow>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn delete_user_data(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.responses.remove(&user_id);
        tables.preferences.remove(&user_id);
        tables.profiles.remove(&user_id);

        let owned: Vec<Uuid> = tables
            .conversations
            .iter()
            .filter(|(_, c)| c.user_id == user_id)
            .map(|(id, _)| *id)
            .collect();
        tables.conversations.retain(|_, c| c.user_id != user_id);
        tables.messages.retain(|m| !owned.contains(&m.conversation_id));
        Ok(())
    }
}
