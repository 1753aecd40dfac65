use async_trait::async_trait;
use reqwest::Client;

use super::base::{CompletionRequest, EventStream, ProviderKind, StreamingProvider};
use super::configs::TogetherProviderConfig;
use super::openai::{build_client, stream_chat_completions};
use crate::errors::RelayResult;
use crate::models::message::TurnRole;

/// Together serves an OpenAI compatible chat completions endpoint
pub struct TogetherProvider {
    client: Client,
    config: TogetherProviderConfig,
}

impl TogetherProvider {
    pub fn new(config: TogetherProviderConfig) -> RelayResult<Self> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }
}

#[async_trait]
impl StreamingProvider for TogetherProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Together
    }

    async fn stream(&self, request: CompletionRequest) -> RelayResult<EventStream> {
        // Instructions always go out as a system turn, whatever the model
        let request = CompletionRequest {
            instructions_role: TurnRole::System,
            ..request
        };
        let turns = request.turns_with_instructions();

        stream_chat_completions(
            &self.client,
            &self.config.host,
            &self.config.api_key,
            &request.model,
            &turns,
        )
        .await
    }
}
