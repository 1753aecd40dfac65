use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::errors::RelayResult;
use crate::models::message::{FormattedTurn, TurnRole};

/// The upstream vendors a logical model can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[strum(to_string = "Anthropic")]
    Anthropic,
    #[strum(to_string = "Open AI")]
    OpenAi,
    #[strum(to_string = "Together")]
    Together,
}

impl ProviderKind {
    /// Conventional environment variable holding this provider's credential
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Together => "TOGETHER_API_KEY",
        }
    }

    /// Key of this provider's table in configuration
    pub fn config_key(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Together => "together",
        }
    }
}

/// Provider event reduced to what the relay forwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedEvent {
    Text(String),
    MaxTokens,
    Stop,
}

pub type EventStream = BoxStream<'static, RelayResult<NormalizedEvent>>;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Provider specific model string
    pub model: String,
    pub system: Option<String>,
    /// Role used when the system text is sent as a leading turn
    pub instructions_role: TurnRole,
    pub turns: Vec<FormattedTurn>,
}

impl CompletionRequest {
    pub fn new<S: Into<String>>(model: S, turns: Vec<FormattedTurn>) -> Self {
        Self {
            model: model.into(),
            system: None,
            instructions_role: TurnRole::System,
            turns,
        }
    }

    pub fn with_system(mut self, system: Option<String>, role: TurnRole) -> Self {
        self.system = system;
        self.instructions_role = role;
        self
    }

    /// Turns with the system text prepended, for APIs that take it in-band
    pub fn turns_with_instructions(&self) -> Vec<FormattedTurn> {
        let mut turns = Vec::with_capacity(self.turns.len() + 1);
        if let Some(system) = self.system.as_deref().filter(|s| !s.is_empty()) {
            turns.push(FormattedTurn::new(self.instructions_role, system));
        }
        turns.extend(self.turns.iter().cloned());
        turns
    }
}

/// Base trait for streaming chat providers (Anthropic, OpenAI, Together)
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Open a streaming completion and return its events in arrival order
    async fn stream(&self, request: CompletionRequest) -> RelayResult<EventStream>;
}
