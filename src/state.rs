//! Application state: configuration and the shared generation gateway.
//!
//! Sessions are not stored here. Each WebSocket connection owns its own
//! `Coordinator`, and HTTP generation is stateless.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_config_from_env, AppConfig};
use crate::gateway::{ContentModel, Gateway};
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub config: AppConfig,
}

impl AppState {
    /// Build state from env: load config, init OpenAI if a key is present.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_config_from_env();

        let openai = OpenAI::from_env(config.limits.generation_timeout());
        if let Some(oa) = &openai {
            info!(target: "pdfstudy", base_url = %oa.base_url, model = %oa.model, title_model = %oa.title_model, "OpenAI enabled.");
        } else {
            info!(target: "pdfstudy", "OpenAI disabled (no OPENAI_API_KEY). Generation requests will fail.");
        }

        let model = openai.map(|oa| Arc::new(oa) as Arc<dyn ContentModel>);
        Self::with_model(model, config)
    }

    /// State around an explicit model (or none), e.g. a scripted one in tests.
    pub fn with_model(model: Option<Arc<dyn ContentModel>>, config: AppConfig) -> Self {
        info!(
            target: "pdfstudy",
            max_upload_bytes = config.limits.max_upload_bytes,
            generation_timeout_secs = config.limits.generation_timeout_secs,
            "Limits in effect"
        );
        let gateway = Gateway::new(model, config.prompts.clone());
        Self { gateway: Arc::new(gateway), config }
    }
}
