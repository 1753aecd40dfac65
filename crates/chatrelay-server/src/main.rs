mod configuration;
mod error;
mod routes;
mod state;

use chatrelay::providers::base::ProviderKind;
use configuration::Settings;
use error::to_env_var;
use state::AppState;
use strum::IntoEnumIterator;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials usually live in a local .env during development
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new()?;
    let state = AppState::from_settings(&settings)?;

    for kind in ProviderKind::iter() {
        let provider = settings.providers.get(kind);
        if state.providers.is_configured(kind) {
            info!(provider = %kind, host = %provider.host, "Provider enabled");
        } else {
            let prefixed = format!("providers.{}.api_key", kind.config_key());
            warn!(
                "{} disabled: set {} or {} to enable it",
                kind,
                kind.api_key_env(),
                to_env_var(&prefixed)
            );
        }
    }

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
