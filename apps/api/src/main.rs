mod auth;
mod chat;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod profile;
mod questionnaire;
mod resources;
mod routes;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::patterns::ResponsePicker;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{OpenAiClient, TextGenerator};
use crate::questionnaire::catalog::bundled_questionnaire;
use crate::resources::catalog::ResourceCatalog;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareCompass API v{}", env!("CARGO_PKG_VERSION"));

    let questionnaire = bundled_questionnaire().context("bundled questionnaire is malformed")?;
    let catalog = ResourceCatalog::bundled().context("bundled resource catalog is malformed")?;
    info!("Loaded {} questions", questionnaire.len());

    // Storage: PostgreSQL when configured, in-memory otherwise
    let state = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url).await?;
            let store = Arc::new(PgStore::new(pool));
            store
                .seed_questionnaire(&questionnaire)
                .await
                .context("failed to seed questionnaire")?;
            app_state(store.clone(), store, catalog, &config)?
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            let store = Arc::new(MemoryStore::new(questionnaire));
            app_state(store.clone(), store, catalog, &config)?
        }
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client once it has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app_state(
    auth: Arc<dyn store::AuthProvider>,
    store: Arc<dyn store::DataStore>,
    catalog: ResourceCatalog,
    config: &Config,
) -> Result<AppState> {
    info!(
        "Chat mode: {}",
        if config.has_api_key() { "generated" } else { "canned" }
    );
    let llm: Option<Arc<dyn TextGenerator>> = match config.openai_api_key.clone() {
        Some(key) => {
            let client = OpenAiClient::new(
                key,
                config.openai_api_url.clone(),
                config.openai_model.clone(),
                Duration::from_secs(config.llm_timeout_secs),
            )
            .context("failed to build LLM HTTP client")?;
            info!("LLM client initialized (model: {})", client.model());
            Some(Arc::new(client))
        }
        None => {
            warn!("OPENAI_API_KEY not set, chat will answer from canned responses");
            None
        }
    };

    Ok(AppState {
        auth,
        store,
        llm,
        catalog: Arc::new(catalog),
        picker: Arc::new(ResponsePicker::new(config.chat_rng_seed)),
        config: config.clone(),
    })
}
