use std::sync::Arc;

use crate::chat::patterns::ResponsePicker;
use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::resources::catalog::ResourceCatalog;
use crate::store::{AuthProvider, DataStore};

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main`; every clone shares the same store and clients.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn DataStore>,
    /// `None` when no API key is configured.
    pub llm: Option<Arc<dyn TextGenerator>>,
    pub catalog: Arc<ResourceCatalog>,
    pub picker: Arc<ResponsePicker>,
    pub config: Config,
}
