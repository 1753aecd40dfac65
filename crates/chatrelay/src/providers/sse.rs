use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::errors::{RelayError, RelayResult};

const DONE_MARKER: &str = "[DONE]";

/// Split a server-sent event body into the `data` payload of each event.
///
/// Comment lines and the OpenAI style `[DONE]` marker are dropped, multi-line
/// data fields are joined with `\n` as the event-stream format prescribes.
pub fn data_events<S>(body: S) -> BoxStream<'static, RelayResult<String>>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let stream = async_stream::try_stream! {
        let mut body = Box::pin(body);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(RelayError::Http)?;
            buffer.extend_from_slice(&chunk);

            while let Some((end, separator)) = next_boundary(&buffer) {
                let block: Vec<u8> = buffer.drain(..end + separator).collect();
                if let Some(data) = parse_block(&String::from_utf8_lossy(&block[..end])) {
                    yield data;
                }
            }
        }

        if let Some(data) = parse_block(&String::from_utf8_lossy(&buffer)) {
            yield data;
        }
    };

    stream.boxed()
}

// Position and length of the first blank line separating two events
fn next_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_block(block: &str) -> Option<String> {
    let lines: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        return None;
    }

    let data = lines.join("\n");
    if data.trim() == DONE_MARKER {
        return None;
    }
    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, reqwest::Error>> {
        let owned: Vec<Result<Bytes, reqwest::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        stream::iter(owned)
    }

    async fn collect_events(parts: &[&str]) -> Vec<String> {
        data_events(chunks(parts))
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_events_split_across_chunks() {
        let events = collect_events(&["data: {\"a\"", ":1}\n", "\ndata: {\"b\":2}\n\n"]).await;
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn test_named_events_and_comments() {
        let events = collect_events(&[
            ": keep-alive\n\n",
            "event: message_start\ndata: {\"type\":\"message_start\"}\n\n",
            "event: ping\r\ndata: {\"type\":\"ping\"}\r\n\r\n",
        ])
        .await;
        assert_eq!(
            events,
            vec!["{\"type\":\"message_start\"}", "{\"type\":\"ping\"}"]
        );
    }

    #[tokio::test]
    async fn test_done_marker_and_trailing_event() {
        let events = collect_events(&["data: first\n\n", "data: [DONE]\n\n", "data: tail"]).await;
        assert_eq!(events, vec!["first", "tail"]);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let text = "data: caf\u{e9}\n\n";
        let bytes = text.as_bytes();
        let split = bytes.len() - 3;
        let parts: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];
        let events: Vec<String> = data_events(stream::iter(parts))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(events, vec!["caf\u{e9}"]);
    }

    #[tokio::test]
    async fn test_multiline_data() {
        let events = collect_events(&["data: one\ndata: two\n\n"]).await;
        assert_eq!(events, vec!["one\ntwo"]);
    }
}
