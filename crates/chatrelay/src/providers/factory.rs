use std::fmt;
use std::sync::Arc;

use super::{
    anthropic::AnthropicProvider,
    base::{ProviderKind, StreamingProvider},
    configs::ProviderConfig,
    openai::OpenAiProvider,
    together::TogetherProvider,
};
use crate::errors::{RelayError, RelayResult};

pub fn get_provider(config: ProviderConfig) -> RelayResult<Arc<dyn StreamingProvider>> {
    match config {
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::OpenAi(openai_config) => Ok(Arc::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Together(together_config) => {
            Ok(Arc::new(TogetherProvider::new(together_config)?))
        }
    }
}

/// Provider handles shared by every request, one optional slot per provider.
///
/// An empty slot means the provider's credential was not configured; the
/// error only surfaces when a request selects that provider.
#[derive(Clone, Default)]
pub struct ProviderSet {
    anthropic: Option<Arc<dyn StreamingProvider>>,
    openai: Option<Arc<dyn StreamingProvider>>,
    together: Option<Arc<dyn StreamingProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build handles for every given config, providers left out stay absent
    pub fn from_configs<I>(configs: I) -> RelayResult<Self>
    where
        I: IntoIterator<Item = ProviderConfig>,
    {
        configs
            .into_iter()
            .try_fold(Self::new(), |set, config| Ok(set.with_provider(get_provider(config)?)))
    }

    /// Place a provider in the slot matching its kind, replacing any previous one
    pub fn with_provider(mut self, provider: Arc<dyn StreamingProvider>) -> Self {
        let kind = provider.kind();
        *self.slot_mut(kind) = Some(provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> RelayResult<Arc<dyn StreamingProvider>> {
        self.slot(kind)
            .clone()
            .ok_or(RelayError::ProviderNotConfigured { provider: kind })
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.slot(kind).is_some()
    }

    fn slot(&self, kind: ProviderKind) -> &Option<Arc<dyn StreamingProvider>> {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Together => &self.together,
        }
    }

    fn slot_mut(&mut self, kind: ProviderKind) -> &mut Option<Arc<dyn StreamingProvider>> {
        match kind {
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Together => &mut self.together,
        }
    }
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet")
            .field("anthropic", &self.anthropic.is_some())
            .field("openai", &self.openai.is_some())
            .field("together", &self.together.is_some())
            .finish()
    }
}
