use chatrelay::catalog::ModelCatalog;
use chatrelay::providers::factory::ProviderSet;
use std::sync::Arc;

use crate::configuration::Settings;
use crate::error::ConfigError;

/// Shared application state, read-only once the server is up
#[derive(Clone, Debug)]
pub struct AppState {
    pub providers: ProviderSet,
    pub catalog: Arc<ModelCatalog>,
}

impl AppState {
    pub fn new(providers: ProviderSet, catalog: ModelCatalog) -> Self {
        Self {
            providers,
            catalog: Arc::new(catalog),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self::new(settings.providers()?, settings.catalog()?))
    }
}
