use crate::profile::service::UserProfile;
use crate::resources::models::Resource;

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant for NYC residents seeking social services and resources. \
    Your goal is to provide accurate, concise information about housing, healthcare, food assistance, and other essential services in NYC. \
    Always prioritize emergency resources for urgent needs. Be empathetic but direct.";

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 500;

/// Resources from the user's location included as prompt context.
pub const CONTEXT_RESOURCE_LIMIT: usize = 5;

/// The fixed system prompt, followed by the user's profile and nearby resources when known.
pub fn build_system_prompt(profile: Option<&UserProfile>, resources: &[&Resource]) -> String {
    let mut prompt = CHAT_SYSTEM_PROMPT.to_string();

    if let Some(profile) = profile {
        let json = serde_json::to_string(profile).unwrap_or_default();
        prompt.push_str("\nThe user's profile indicates: ");
        prompt.push_str(&json);
    }

    if !resources.is_empty() {
        let json = serde_json::to_string(resources).unwrap_or_default();
        prompt.push_str("\nRelevant resources: ");
        prompt.push_str(&json);
    }

    prompt
}
