use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Terminal marker carried by the last content-less frame of a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameState {
    Stop,
    MaxTokens,
}

/// One normalized unit of streamed output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFrame {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FrameState>,
}

impl StreamFrame {
    pub fn text<S: Into<String>, T: Into<String>>(id: S, content: T) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            state: None,
        }
    }

    pub fn terminal<S: Into<String>>(id: S, state: FrameState) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            state: Some(state),
        }
    }
}

// Event stream framing for the three kinds of output line
pub struct FrameFormatter;

impl FrameFormatter {
    pub fn format_frame(frame: &StreamFrame) -> String {
        let encoded = serde_json::to_string(frame).unwrap_or_else(|_| String::from("{}"));
        format!("data: {}\n\n", encoded)
    }

    /// Error event; every line of the message stays inside one event
    pub fn format_error(message: &str) -> String {
        let normalized = message.replace("\r\n", "\n");
        let mut event = String::from("data: [ERROR] ");
        let mut lines = normalized.split(['\n', '\r']);
        event.push_str(lines.next().unwrap_or_default());
        for line in lines {
            event.push_str("\ndata: ");
            event.push_str(line);
        }
        event.push_str("\n\n");
        event
    }

    pub fn format_done() -> String {
        "data: [DONE]\n\n".to_string()
    }
}

static LAST_STREAM_ID: AtomicI64 = AtomicI64::new(0);

/// Correlation id shared by every frame of one response.
///
/// Epoch milliseconds, bumped past the previous id when two streams start
/// within the same millisecond so ids stay strictly increasing in a process.
pub fn next_stream_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STREAM_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STREAM_ID.compare_exchange_weak(
            last,
            candidate,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate.to_string(),
            Err(current) => last = current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_text_frame() {
        let frame = StreamFrame::text("1700000000000", "Hel");
        assert_eq!(
            FrameFormatter::format_frame(&frame),
            "data: {\"id\":\"1700000000000\",\"content\":\"Hel\"}\n\n"
        );
    }

    #[test]
    fn test_format_terminal_frames() {
        let stop = StreamFrame::terminal("7", FrameState::Stop);
        assert_eq!(
            FrameFormatter::format_frame(&stop),
            "data: {\"id\":\"7\",\"content\":\"\",\"state\":\"stop\"}\n\n"
        );

        let truncated = StreamFrame::terminal("7", FrameState::MaxTokens);
        assert_eq!(
            FrameFormatter::format_frame(&truncated),
            "data: {\"id\":\"7\",\"content\":\"\",\"state\":\"max_tokens\"}\n\n"
        );
    }

    #[test]
    fn test_content_is_json_escaped() {
        let frame = StreamFrame::text("1", "line one\n\"quoted\"");
        let encoded = FrameFormatter::format_frame(&frame);
        let payload = encoded
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        let decoded: StreamFrame = serde_json::from_str(payload).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(FrameFormatter::format_done(), "data: [DONE]\n\n");
        assert_eq!(
            FrameFormatter::format_error("Unsupported model: gpt-2"),
            "data: [ERROR] Unsupported model: gpt-2\n\n"
        );
    }

    #[test]
    fn test_multiline_error_stays_in_one_event() {
        let encoded = FrameFormatter::format_error("502 Bad Gateway\r\n\r\n<html>\noops</html>");
        assert_eq!(
            encoded,
            "data: [ERROR] 502 Bad Gateway\ndata: \ndata: <html>\ndata: oops</html>\n\n"
        );
        assert_eq!(encoded.matches("\n\n").count(), 1);
        assert!(encoded.ends_with("\n\n"));
    }

    #[test]
    fn test_stream_ids_strictly_increase() {
        let ids: Vec<i64> = (0..50)
            .map(|_| next_stream_id().parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(ids[0] >= Utc::now().timestamp_millis() - 60_000);
    }
}
