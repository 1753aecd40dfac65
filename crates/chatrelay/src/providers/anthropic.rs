use async_trait::async_trait;
use futures::{future, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::base::{CompletionRequest, EventStream, NormalizedEvent, ProviderKind, StreamingProvider};
use super::configs::AnthropicProviderConfig;
use super::sse::data_events;
use crate::errors::{RelayError, RelayResult};
use crate::models::message::FormattedTurn;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Output ceiling sent with every request, the Messages API requires one
pub const ANTHROPIC_MAX_TOKENS: u32 = 8192;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: &MessagesRequest<'_>) -> RelayResult<reqwest::Response> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response),
            status => Err(RelayError::Api {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl StreamingProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn stream(&self, request: CompletionRequest) -> RelayResult<EventStream> {
        // System text travels in its own field, never as a turn
        let payload = MessagesRequest {
            model: &request.model,
            messages: &request.turns,
            system: request.system.as_deref().filter(|s| !s.is_empty()),
            max_tokens: ANTHROPIC_MAX_TOKENS,
            stream: true,
        };

        let response = self.post(&payload).await?;

        let events = data_events(response.bytes_stream()).filter_map(|data| {
            future::ready(match data {
                Ok(data) => translate_event(&data).transpose(),
                Err(e) => Some(Err(e)),
            })
        });

        Ok(events.boxed())
    }
}

/// Map one Messages API stream event onto the relay's event vocabulary
fn translate_event(data: &str) -> RelayResult<Option<NormalizedEvent>> {
    let event: StreamEvent = serde_json::from_str(data)?;

    let normalized = match event.event_type.as_str() {
        "content_block_delta" => event
            .delta
            .and_then(|delta| delta.text)
            .filter(|text| !text.is_empty())
            .map(NormalizedEvent::Text),
        "content_block_stop" => Some(NormalizedEvent::Stop),
        "message_delta" => event
            .delta
            .and_then(|delta| delta.stop_reason)
            .filter(|reason| reason == "max_tokens")
            .map(|_| NormalizedEvent::MaxTokens),
        "error" => {
            let message = event
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(RelayError::Stream(message));
        }
        _ => None,
    };

    Ok(normalized)
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: &'a [FormattedTurn],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}
