//! Chat fallback chain.
//!
//! ```text
//! text generation configured? ── no ──────────────┐
//!        │ yes                                     ▼
//!   generate(system, message) ── error ──► pattern match ── no match ──► generic fallback
//!        │ ok
//!        ▼
//!      reply
//! ```
//!
//! Persistence is best effort: when a user id is known the turn is stored in the
//! user's latest conversation, and any store failure is logged and skipped.

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::emergency::{contains_emergency_phrase, EmergencyContact, EMERGENCY_CONTACTS};
use super::patterns::ResponsePicker;
use super::prompts::{build_system_prompt, CONTEXT_RESOURCE_LIMIT, MAX_TOKENS, TEMPERATURE};
use super::sanitize::sanitize_response;
use crate::llm_client::TextGenerator;
use crate::models::chat::ChatRole;
use crate::models::user::AuthUser;
use crate::profile::service::{load_user_profile, UserProfile};
use crate::resources::catalog::ResourceCatalog;
use crate::store::DataStore;

/// Everything one chat turn reads from.
pub struct ChatContext<'a> {
    pub store: &'a dyn DataStore,
    pub catalog: &'a ResourceCatalog,
    pub llm: Option<&'a dyn TextGenerator>,
    pub picker: &'a ResponsePicker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub text: String,
    #[serde(rename = "isAIUnavailable")]
    pub is_ai_unavailable: bool,
    pub emergency_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contacts: Option<Vec<EmergencyContact>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub text: String,
    pub is_ai_unavailable: bool,
}

/// Generated text when possible, canned text otherwise. Never fails.
pub async fn generate_reply(
    llm: Option<&dyn TextGenerator>,
    picker: &ResponsePicker,
    system_prompt: &str,
    message: &str,
) -> GeneratedReply {
    let Some(llm) = llm else {
        warn!("Text generation is not configured, answering from patterns");
        return GeneratedReply {
            text: picker.respond(message).to_string(),
            is_ai_unavailable: true,
        };
    };

    match llm.generate(system_prompt, message, TEMPERATURE, MAX_TOKENS).await {
        Ok(text) => GeneratedReply {
            text,
            is_ai_unavailable: false,
        },
        Err(e) => {
            error!("Text generation failed, using fallback response: {e}");
            GeneratedReply {
                text: picker.respond(message).to_string(),
                is_ai_unavailable: true,
            }
        }
    }
}

/// Profile context for a user id sent by the chat widget. `None` when it cannot be loaded.
async fn load_profile_for(store: &dyn DataStore, user_id: Uuid) -> Option<UserProfile> {
    match store.get_profile(user_id).await {
        Ok(Some(profile)) => {
            let user = AuthUser {
                id: user_id,
                email: profile.email,
                name: Some(profile.name),
            };
            Some(load_user_profile(store, Some(&user)).await)
        }
        Ok(None) => {
            warn!("No profile for chat user {user_id}");
            None
        }
        Err(e) => {
            error!("Error fetching profile for chat user {user_id}: {e}");
            None
        }
    }
}

/// Reuses the most recent conversation, or opens one, and stores the user's message.
async fn record_user_message(store: &dyn DataStore, user_id: Uuid, message: &str) -> Option<Uuid> {
    let conversation_id = match store.latest_conversation(user_id).await {
        Ok(Some(id)) => {
            if let Err(e) = store.touch_conversation(id).await {
                warn!("Failed to update conversation {id}: {e}");
            }
            id
        }
        Ok(None) => match store.create_conversation(user_id).await {
            Ok(id) => id,
            Err(e) => {
                error!("Error creating conversation for {user_id}: {e}");
                return None;
            }
        },
        Err(e) => {
            error!("Error checking for existing conversation for {user_id}: {e}");
            return None;
        }
    };

    if let Err(e) = store
        .insert_chat_message(conversation_id, ChatRole::User, message)
        .await
    {
        error!("Failed to store user message in {conversation_id}: {e}");
    }
    Some(conversation_id)
}

pub async fn respond(ctx: &ChatContext<'_>, message: &str, user_id: Option<Uuid>) -> ChatReply {
    let emergency_detected = contains_emergency_phrase(message);

    let profile = match user_id {
        Some(id) => load_profile_for(ctx.store, id).await,
        None => None,
    };
    let resources = profile
        .as_ref()
        .map(|p| ctx.catalog.sample(&p.location, CONTEXT_RESOURCE_LIMIT))
        .unwrap_or_default();
    let system_prompt = build_system_prompt(profile.as_ref(), &resources);

    let conversation_id = match user_id {
        Some(id) => record_user_message(ctx.store, id, message).await,
        None => None,
    };

    let GeneratedReply {
        mut text,
        is_ai_unavailable,
    } = generate_reply(ctx.llm, ctx.picker, &system_prompt, message).await;

    if let Some(conversation_id) = conversation_id {
        let sanitized = sanitize_response(&text);
        match ctx
            .store
            .insert_chat_message(conversation_id, ChatRole::Assistant, &sanitized)
            .await
        {
            Ok(_) => text = sanitized,
            Err(e) => error!("Error storing assistant response in {conversation_id}: {e}"),
        }
    }

    info!(
        "Chat reply sent (ai_unavailable={is_ai_unavailable}, emergency={emergency_detected})"
    );

    ChatReply {
        text,
        is_ai_unavailable,
        emergency_detected,
        emergency_contacts: emergency_detected.then(|| EMERGENCY_CONTACTS.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::chat::patterns::{FALLBACK_RESPONSES, HOUSING_KEYWORDS};
    use crate::llm_client::LlmError;
    use crate::models::profile::{Preferences, Profile};
    use crate::questionnaire::catalog::bundled_questionnaire;
    use crate::store::memory::MemoryStore;

    struct FixedGenerator {
        reply: Result<String, u16>,
        last_system: Mutex<Option<String>>,
    }

    impl FixedGenerator {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                last_system: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(503),
                last_system: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(
            &self,
            system: &str,
            _prompt: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            *self.last_system.lock().unwrap() = Some(system.to_string());
            self.reply.clone().map_err(|status| LlmError::Api {
                status,
                message: "unavailable".into(),
            })
        }
    }

    fn fixtures() -> (MemoryStore, ResourceCatalog, ResponsePicker) {
        (
            MemoryStore::new(bundled_questionnaire().unwrap()),
            ResourceCatalog::bundled().unwrap(),
            ResponsePicker::new(Some(1)),
        )
    }

    #[tokio::test]
    async fn test_no_generator_uses_housing_pattern() {
        let (store, catalog, picker) = fixtures();
        let ctx = ChatContext { store: &store, catalog: &catalog, llm: None, picker: &picker };

        let reply = respond(&ctx, "I need help with rent", None).await;
        assert!(reply.is_ai_unavailable);
        assert!(reply.text.contains("housing") || reply.text.contains("eviction"));
        assert!(!reply.emergency_detected);
        assert!(reply.emergency_contacts.is_none());
    }

    #[tokio::test]
    async fn test_generated_text_is_returned() {
        let (store, catalog, picker) = fixtures();
        let llm = FixedGenerator::ok("Try calling 311.");
        let ctx = ChatContext { store: &store, catalog: &catalog, llm: Some(&llm), picker: &picker };

        let reply = respond(&ctx, "hello", None).await;
        assert_eq!(reply.text, "Try calling 311.");
        assert!(!reply.is_ai_unavailable);
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back() {
        let (store, catalog, picker) = fixtures();
        let llm = FixedGenerator::failing();
        let ctx = ChatContext { store: &store, catalog: &catalog, llm: Some(&llm), picker: &picker };

        let reply = respond(&ctx, "good morning", None).await;
        assert!(reply.is_ai_unavailable);
        assert!(FALLBACK_RESPONSES.contains(&reply.text.as_str()));
    }

    #[tokio::test]
    async fn test_emergency_detected_on_any_path() {
        let (store, catalog, picker) = fixtures();
        let llm = FixedGenerator::ok("You are not alone.");
        let ctx = ChatContext { store: &store, catalog: &catalog, llm: Some(&llm), picker: &picker };

        let reply = respond(&ctx, "I want to kill myself", None).await;
        assert!(reply.emergency_detected);
        assert_eq!(reply.emergency_contacts.map(|c| c.len()), Some(4));

        let ctx = ChatContext { llm: None, ..ctx };
        assert!(respond(&ctx, "I want to kill myself", None).await.emergency_detected);
    }

    #[tokio::test]
    async fn test_known_user_turn_is_persisted_sanitized() {
        let (store, catalog, picker) = fixtures();
        let user_id = Uuid::new_v4();
        store
            .insert_profile(&Profile {
                id: user_id,
                name: "Ana".into(),
                email: "ana@example.com".into(),
                onboarding_completed: true,
            })
            .await
            .unwrap();
        store
            .upsert_preferences(&Preferences {
                location: Some("boston".into()),
                ..Preferences::new(user_id)
            })
            .await
            .unwrap();

        let llm = FixedGenerator::ok("\u{201C}Call 311\u{201D}\n\n\n\nthen visit \u{2014} soon");
        let ctx = ChatContext { store: &store, catalog: &catalog, llm: Some(&llm), picker: &picker };

        let reply = respond(&ctx, "where do I start", Some(user_id)).await;
        assert_eq!(reply.text, "\"Call 311\"\n\nthen visit - soon");

        let system = llm.last_system.lock().unwrap().clone().unwrap();
        assert!(system.contains("The user's profile indicates"));
        assert!(system.contains("Boston"));

        let conversation = store.latest_conversation(user_id).await.unwrap().unwrap();
        let messages = store.conversation_messages(conversation).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].content, reply.text);

        // A second turn reuses the conversation.
        respond(&ctx, HOUSING_KEYWORDS[0], Some(user_id)).await;
        assert_eq!(store.latest_conversation(user_id).await.unwrap(), Some(conversation));
        assert_eq!(store.conversation_messages(conversation).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_anonymous_reply_is_not_sanitized() {
        let (store, catalog, picker) = fixtures();
        let llm = FixedGenerator::ok("a \u{2014} b");
        let ctx = ChatContext { store: &store, catalog: &catalog, llm: Some(&llm), picker: &picker };
        assert_eq!(respond(&ctx, "hi", None).await.text, "a \u{2014} b");
    }
}
