use std::sync::Arc;
use dg_core::config::ModelKind;
use dg_core::{DigestConfig, LanguageModel, Result};

pub mod chat;
pub mod dummy;

pub use chat::ChatCompletionsModel;
pub use dummy::DummyModel;

pub fn create_model(config: &DigestConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.model {
        ModelKind::Groq => Ok(Arc::new(ChatCompletionsModel::new(
            config.model_api_key.clone(),
            config.model_url.clone(),
            config.model_name.clone(),
        )?)),
        ModelKind::Dummy => Ok(Arc::new(DummyModel::new())),
    }
}
