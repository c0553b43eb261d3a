use crate::api::{ApiResponse, state::AppState};
use axum::extract::State;
use parla_models::DEFAULT_MODEL;
use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    pub models: Vec<String>,
    pub default_model: String,
}

/// GET /api/models - List the model identifiers accepted by /api/chat
pub async fn list_models(State(state): State<AppState>) -> ApiResponse<ModelCatalog> {
    ApiResponse::ok(ModelCatalog {
        models: state.registry.available_models(),
        default_model: DEFAULT_MODEL.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::ChatContext;
    use crate::config::ServerConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_models() {
        let state = Arc::new(ChatContext::from_config(&ServerConfig::default()));

        let body = list_models(State(state)).await;

        assert!(body.success);
        let catalog = body.data.unwrap();
        assert_eq!(
            catalog.models,
            vec!["gemini-2.5-flash".to_string(), "gemini-2.5-pro".to_string()]
        );
        assert_eq!(catalog.default_model, "gemini-2.5-flash");
    }
}
