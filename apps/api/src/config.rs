use anyhow::{Context, Result};

pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";

/// Application configuration loaded from environment variables.
/// Everything is optional: without `DATABASE_URL` the in-memory store is used and
/// without `OPENAI_API_KEY` chat runs on pattern matching only.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_url: String,
    pub openai_model: String,
    pub llm_timeout_secs: u64,
    pub chat_rng_seed: Option<u64>,
    pub enable_demo_tools: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: get("DATABASE_URL"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_url: get("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: get("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            chat_rng_seed: get("CHAT_RNG_SEED")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("CHAT_RNG_SEED must be an unsigned integer")?,
            enable_demo_tools: get("ENABLE_DEMO_TOOLS")
                .map(|v| parse_bool(&v))
                .transpose()
                .context("ENABLE_DEMO_TOOLS must be true or false")?
                .unwrap_or(false),
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised boolean '{other}'"),
    }
}
