use crate::error::ConfigError;
use chatrelay::catalog::ModelCatalog;
use chatrelay::providers::{
    base::ProviderKind,
    configs::{
        AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig, TogetherProviderConfig,
        ANTHROPIC_HOST, OPENAI_HOST, TOGETHER_HOST,
    },
    factory::ProviderSet,
};
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{AddrParseError, SocketAddr};
use strum::IntoEnumIterator;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Endpoint and credential of one provider; no key leaves the provider disabled
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    fn api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProvidersSettings {
    pub anthropic: ProviderSettings,
    pub openai: ProviderSettings,
    pub together: ProviderSettings,
}

impl ProvidersSettings {
    pub fn get(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Together => &self.together,
        }
    }

    // Convert to the chatrelay ProviderConfig list, skipping providers without a key
    pub fn to_configs(&self) -> Vec<ProviderConfig> {
        let mut configs = Vec::new();
        if let Some(api_key) = self.anthropic.api_key() {
            configs.push(ProviderConfig::Anthropic(AnthropicProviderConfig {
                host: self.anthropic.host.clone(),
                api_key,
            }));
        }
        if let Some(api_key) = self.openai.api_key() {
            configs.push(ProviderConfig::OpenAi(OpenAiProviderConfig {
                host: self.openai.host.clone(),
                api_key,
            }));
        }
        if let Some(api_key) = self.together.api_key() {
            configs.push(ProviderConfig::Together(TogetherProviderConfig {
                host: self.together.host.clone(),
                api_key,
            }));
        }
        configs
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub providers: ProvidersSettings,
    /// Provider model string overrides keyed by logical model name
    #[serde(default)]
    pub models: HashMap<String, String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("providers.anthropic.host", ANTHROPIC_HOST)?
            .set_default("providers.openai.host", OPENAI_HOST)?
            .set_default("providers.together.host", TOGETHER_HOST)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        // Conventional credential variables win over prefixed ones
        for kind in ProviderKind::iter() {
            builder = builder.set_override_option(
                format!("providers.{}.api_key", kind.config_key()),
                credential_from_env(kind),
            )?;
        }
        let config = builder.build()?;

        let settings: Self = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Config(err)
        })?;

        // Fail at startup rather than on the first request
        settings.catalog()?;
        Ok(settings)
    }

    pub fn providers(&self) -> Result<ProviderSet, ConfigError> {
        Ok(ProviderSet::from_configs(self.providers.to_configs())?)
    }

    pub fn catalog(&self) -> Result<ModelCatalog, ConfigError> {
        Ok(ModelCatalog::new().with_overrides(&self.models)?)
    }
}

fn credential_from_env(kind: ProviderKind) -> Option<String> {
    std::env::var(kind.api_key_env())
        .ok()
        .filter(|key| !key.is_empty())
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
