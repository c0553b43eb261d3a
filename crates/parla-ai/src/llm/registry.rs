//! Model registry built once at process start

use std::collections::BTreeMap;
use std::sync::Arc;

use parla_models::SUPPORTED_MODELS;

use crate::error::{AiError, Result};
use crate::llm::{GeminiClient, LlmClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    Google,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: String,
    pub provider: LlmProvider,
    pub client_model: String,
}

impl ModelSpec {
    pub fn new(
        name: impl Into<String>,
        provider: LlmProvider,
        client_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            client_model: client_model.into(),
        }
    }

    /// Specs for every model the client offers
    pub fn supported() -> Vec<Self> {
        SUPPORTED_MODELS
            .iter()
            .map(|name| Self::new(*name, LlmProvider::Google, *name))
            .collect()
    }
}

/// Provider credentials and endpoint overrides used to build clients
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub google_api_key: Option<String>,
    pub google_base_url: Option<String>,
    /// Connect to the provider without the environment's proxy settings
    pub bypass_system_proxy: bool,
}

/// Immutable map from model identifier to a ready client.
///
/// Lookups are case-insensitive and ignore surrounding whitespace.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    clients: BTreeMap<String, Arc<dyn LlmClient>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for `specs` with the given provider settings
    pub fn from_specs(specs: Vec<ModelSpec>, settings: &ProviderSettings) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            let client: Arc<dyn LlmClient> = match spec.provider {
                LlmProvider::Google => {
                    let mut client =
                        GeminiClient::new(settings.google_api_key.clone().unwrap_or_default())
                            .with_model(spec.client_model);
                    if let Some(base_url) = &settings.google_base_url {
                        client = client.with_base_url(base_url.clone());
                    }
                    if settings.bypass_system_proxy {
                        client = client.without_system_proxy();
                    }
                    Arc::new(client)
                }
            };
            registry.register(spec.name, client);
        }

        if settings.google_api_key.is_none() {
            tracing::warn!("No Google API key configured; chat requests will fail");
        }
        registry
    }

    pub fn register(&mut self, name: impl AsRef<str>, client: Arc<dyn LlmClient>) {
        self.clients.insert(normalize_model_name(name.as_ref()), client);
    }

    pub fn with_client(mut self, name: impl AsRef<str>, client: Arc<dyn LlmClient>) -> Self {
        self.register(name, client);
        self
    }

    pub fn resolve(&self, model: &str) -> Result<Arc<dyn LlmClient>> {
        self.clients
            .get(&normalize_model_name(model))
            .cloned()
            .ok_or_else(|| AiError::UnknownModel(model.to_string()))
    }

    pub fn available_models(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }
}

fn normalize_model_name(model: &str) -> String {
    model.trim().to_lowercase()
}
