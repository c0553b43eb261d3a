use parla_ai::{ModelRegistry, ModelSpec, ProviderSettings};
use std::sync::Arc;

use crate::config::ServerConfig;

/// Read-only context shared by every request
pub struct ChatContext {
    pub registry: ModelRegistry,
    pub default_system_prompt: String,
}

impl ChatContext {
    pub fn from_config(config: &ServerConfig) -> Self {
        let settings = ProviderSettings {
            google_api_key: config.google_api_key.clone(),
            google_base_url: config.google_base_url.clone(),
            bypass_system_proxy: config.bypass_system_proxy,
        };
        Self {
            registry: ModelRegistry::from_specs(ModelSpec::supported(), &settings),
            default_system_prompt: config.default_system_prompt.clone(),
        }
    }
}

/// Application state shared across all API handlers
pub type AppState = Arc<ChatContext>;
