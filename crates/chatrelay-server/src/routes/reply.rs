use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use chatrelay::{
    models::message::Message,
    relay::{ResponseSink, StreamingRelay},
};
use futures::Stream;
use serde::Deserialize;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest {
    message: Message,
    #[serde(default)]
    previous_messages: Vec<Message>,
    model: String,
    #[serde(default)]
    system_message: Option<String>,
}

// Event stream body fed by the relay task
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);

        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

/// Sink writing frames into the channel behind an `SseResponse`
struct ChannelSink {
    started: Option<oneshot::Sender<()>>,
    tx: Option<mpsc::Sender<String>>,
}

impl ChannelSink {
    fn new(tx: mpsc::Sender<String>, started: oneshot::Sender<()>) -> Self {
        Self {
            started: Some(started),
            tx: Some(tx),
        }
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn start(&mut self) {
        // Releases the handler, which sends the event-stream headers
        if let Some(started) = self.started.take() {
            let _ = started.send(());
        }
    }

    async fn write(&mut self, chunk: String) {
        if let Some(tx) = &self.tx {
            if tx.send(chunk).await.is_err() {
                tracing::warn!("Client disconnected, dropping remaining frames");
                self.tx = None;
            }
        }
    }

    async fn close(&mut self) {
        // Dropping the sender ends the response body
        self.tx.take();
    }
}

async fn handler(State(state): State<AppState>, Json(request): Json<ReplyRequest>) -> SseResponse {
    tracing::info!(
        model = %request.model,
        history = request.previous_messages.len(),
        "Reply requested"
    );

    let (tx, rx) = mpsc::channel(100);
    let (started_tx, started_rx) = oneshot::channel();

    let mut relay = StreamingRelay::new(
        request.model,
        request.system_message,
        state.providers.clone(),
        state.catalog.clone(),
    );
    let message = request.message;
    let previous_messages = request.previous_messages;

    tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx, started_tx);
        relay.run(message, previous_messages, &mut sink).await;
    });

    // Headers go out once the relay switched the sink to event-stream mode
    let _ = started_rx.await;
    SseResponse::new(ReceiverStream::new(rx))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reply", post(handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chatrelay::catalog::ModelCatalog;
    use chatrelay::models::frame::StreamFrame;
    use chatrelay::providers::configs::{OpenAiProviderConfig, ProviderConfig};
    use chatrelay::providers::factory::ProviderSet;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn openai_state() -> (MockServer, AppState) {
        let mock_server = MockServer::start().await;
        let body = [
            json!({"choices": [{"index": 0, "delta": {"content": "Hel"}, "finish_reason": null}]}),
            json!({"choices": [{"index": 0, "delta": {"content": "lo"}, "finish_reason": null}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}),
        ]
        .iter()
        .map(|chunk| format!("data: {}\n\n", chunk))
        .collect::<String>()
            + "data: [DONE]\n\n";

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&mock_server)
            .await;

        let providers = ProviderSet::from_configs(vec![ProviderConfig::OpenAi(
            OpenAiProviderConfig {
                host: mock_server.uri(),
                api_key: "test_api_key".to_string(),
            },
        )])
        .unwrap();

        (mock_server, AppState::new(providers, ModelCatalog::new()))
    }

    fn reply_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .uri("/reply")
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_reply_streams_frames() {
        let (_server, state) = openai_state().await;
        let app = routes(state);

        let request = reply_request(json!({
            "message": {"id": "2", "text": "hi", "role": "user"},
            "previousMessages": [
                {"id": "1", "text": "earlier", "role": "user"},
                {"id": "1b", "text": "reply", "role": "assistant", "isFinished": true}
            ],
            "model": "chatgpt-4o",
            "systemMessage": "be brief"
        }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache"
        );

        let text = body_text(response).await;
        let blocks: Vec<&str> = text.split_terminator("\n\n").collect();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[3], "data: [DONE]");

        let frames: Vec<StreamFrame> = blocks[..3]
            .iter()
            .map(|b| serde_json::from_str(b.strip_prefix("data: ").unwrap()).unwrap())
            .collect();
        assert_eq!(frames[0].content, "Hel");
        assert_eq!(frames[1].content, "lo");
        assert_eq!(frames[2].content, "");
        assert!(frames.iter().all(|f| f.id == frames[0].id));
    }

    #[tokio::test]
    async fn test_reply_missing_provider() {
        let (_server, state) = openai_state().await;
        let app = routes(state);

        let request = reply_request(json!({
            "message": {"id": "1", "text": "hi", "role": "user"},
            "model": "claude-3-7-sonnet"
        }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            "data: [ERROR] Anthropic was not initialized because ANTHROPIC_API_KEY was not provided\n\n"
        );
    }

    #[tokio::test]
    async fn test_reply_unsupported_model() {
        let (_server, state) = openai_state().await;
        let app = routes(state);

        let request = reply_request(json!({
            "message": {"id": "1", "text": "hi", "role": "user"},
            "model": "gpt-2"
        }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            body_text(response).await,
            "data: [ERROR] Unsupported model: gpt-2\n\n"
        );
    }

    #[tokio::test]
    async fn test_reply_rejects_malformed_body() {
        let (_server, state) = openai_state().await;
        let app = routes(state);

        let request = reply_request(json!({"model": "chatgpt-4o"}));

        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
