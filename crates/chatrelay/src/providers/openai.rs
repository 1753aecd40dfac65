use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::base::{CompletionRequest, EventStream, NormalizedEvent, ProviderKind, StreamingProvider};
use super::configs::OpenAiProviderConfig;
use super::sse::data_events;
use crate::errors::{RelayError, RelayResult};
use crate::models::message::FormattedTurn;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> RelayResult<Self> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }
}

#[async_trait]
impl StreamingProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn stream(&self, request: CompletionRequest) -> RelayResult<EventStream> {
        // The instructions role depends on the model (o-series models expect "developer")
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

pub(crate) fn build_client() -> RelayResult<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(600)) // 10 minutes timeout
        .build()?)
}

/// Issue a streaming chat completion against any OpenAI compatible endpoint
pub(crate) async fn stream_chat_completions(
    client: &Client,
    host: &str,
    api_key: &str,
    model: &str,
    turns: &[FormattedTurn],
) -> RelayResult<EventStream> {
    let url = format!("{}/v1/chat/completions", host.trim_end_matches('/'));
    let payload = ChatCompletionRequest {
        model,
        messages: turns,
        stream: true,
    };

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&payload)
        .send()
        .await?;

    let response = match response.status() {
        StatusCode::OK => response,
        status => {
            return Err(RelayError::Api {
                status,
                body: response.text().await.unwrap_or_default(),
            })
        }
    };

    let events = data_events(response.bytes_stream()).flat_map(|data| {
        let items: Vec<RelayResult<NormalizedEvent>> =
            match data.and_then(|data| translate_chunk(&data)) {
                Ok(events) => events.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
        stream::iter(items)
    });

    Ok(events.boxed())
}

/// A chunk can carry a final fragment and its finish reason together
fn translate_chunk(data: &str) -> RelayResult<Vec<NormalizedEvent>> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;

    if let Some(error) = chunk.error {
        return Err(RelayError::Stream(error.message));
    }

    let mut events = Vec::new();
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(events);
    };

    if let Some(content) = choice.delta.and_then(|d| d.content) {
        if !content.is_empty() {
            events.push(NormalizedEvent::Text(content));
        }
    }

    match choice.finish_reason.as_deref() {
        Some("length") => events.push(NormalizedEvent::MaxTokens),
        Some("stop") => events.push(NormalizedEvent::Stop),
        _ => {}
    }

    Ok(events)
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [FormattedTurn],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}
