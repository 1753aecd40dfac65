use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::catalog::ModelCatalog;
use crate::errors::RelayResult;
use crate::formatter::build_messages_with_agents;
use crate::models::frame::{next_stream_id, FrameFormatter, FrameState, StreamFrame};
use crate::models::message::Message;
use crate::providers::base::{CompletionRequest, NormalizedEvent};
use crate::providers::factory::ProviderSet;

/// Destination of the event stream for one request
#[async_trait]
pub trait ResponseSink: Send {
    /// Switch to event-stream delivery (`Content-Type: text/event-stream`,
    /// `Cache-Control: no-cache`, `Connection: keep-alive`) and flush headers
    async fn start(&mut self);

    /// Write one already framed chunk
    async fn write(&mut self, chunk: String);

    async fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    HeadersSent,
    Streaming,
    Done,
    Failed,
}

/// Relays one conversation to the provider behind a logical model name
pub struct StreamingRelay {
    model: String,
    system: Option<String>,
    providers: ProviderSet,
    catalog: Arc<ModelCatalog>,
    state: RelayState,
}

impl StreamingRelay {
    pub fn new<S: Into<String>>(
        model: S,
        system: Option<String>,
        providers: ProviderSet,
        catalog: Arc<ModelCatalog>,
    ) -> Self {
        Self {
            model: model.into(),
            system,
            providers,
            catalog,
            state: RelayState::Idle,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Stream the reply to `message` into `sink`.
    ///
    /// Every failure is reported in-band as a single `[ERROR]` frame; the sink
    /// is closed exactly once whichever way the run ends.
    pub async fn run<S: ResponseSink>(
        &mut self,
        message: Message,
        previous_messages: Vec<Message>,
        sink: &mut S,
    ) {
        sink.start().await;
        self.state = RelayState::HeadersSent;

        match self.stream_reply(message, previous_messages, sink).await {
            Ok(()) => {
                sink.write(FrameFormatter::format_done()).await;
                self.state = RelayState::Done;
            }
            Err(e) => {
                error!(model = %self.model, "Relay failed: {}", e);
                sink.write(FrameFormatter::format_error(&e.to_string())).await;
                self.state = RelayState::Failed;
            }
        }

        sink.close().await;
    }

    async fn stream_reply<S: ResponseSink>(
        &mut self,
        message: Message,
        previous_messages: Vec<Message>,
        sink: &mut S,
    ) -> RelayResult<()> {
        let resolved = self.catalog.resolve(&self.model)?;

        let mut conversation = previous_messages;
        conversation.push(message);
        let turns = build_messages_with_agents(&conversation);

        let provider = self.providers.get(resolved.provider)?;
        let request = CompletionRequest::new(resolved.model.as_str(), turns).with_system(
            self.system.clone(),
            resolved.logical.instructions_role(),
        );

        debug!(
            provider = %resolved.provider,
            model = %resolved.model,
            turns = conversation.len(),
            "Opening provider stream"
        );
        let mut events = provider.stream(request).await?;
        self.state = RelayState::Streaming;

        let stream_id = next_stream_id();
        let mut frames = 0usize;
        while let Some(event) = events.next().await {
            let frame = match event? {
                NormalizedEvent::Text(text) => StreamFrame::text(stream_id.as_str(), text),
                NormalizedEvent::MaxTokens => {
                    StreamFrame::terminal(stream_id.as_str(), FrameState::MaxTokens)
                }
                NormalizedEvent::Stop => StreamFrame::terminal(stream_id.as_str(), FrameState::Stop),
            };
            sink.write(FrameFormatter::format_frame(&frame)).await;
            frames += 1;
        }

        info!(stream_id = %stream_id, model = %resolved.logical, frames, "Stream finished");
        Ok(())
    }
}
