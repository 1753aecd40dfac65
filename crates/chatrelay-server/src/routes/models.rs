use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chatrelay::catalog::LogicalModel;
use chatrelay::providers::base::ProviderKind;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: LogicalModel,
    provider: ProviderKind,
    model: String,
    /// False when the provider's credential is missing
    available: bool,
}

async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelInfo>> {
    let models = state
        .catalog
        .entries()
        .into_iter()
        .map(|entry| ModelInfo {
            name: entry.logical,
            provider: entry.provider,
            model: entry.model,
            available: state.providers.is_configured(entry.provider),
        })
        .collect();

    Json(models)
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .with_state(state)
}
