//! Line-framed event stream parser for the redaction backend.
//!
//! The backend's streaming endpoints push newline-separated lines; each
//! logical event is carried on a line prefixed `"data: "` followed by a JSON
//! payload. The payload's field shape, not a type tag, decides the variant.

use std::pin::Pin;

use futures_util::Stream;
use serde_json::Value;

use crate::backend::{ServiceError, ServiceResult};

/// Line prefix marking an event frame.
const DATA_PREFIX: &str = "data: ";

/// A decoded event from a streaming endpoint.
///
/// Exactly one `Done` or `Failure` terminates a stream; `Status` and `Chunk`
/// may repeat any number of times before that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Progress notification; replaces any prior display text.
    Status { message: String },
    /// Incremental content to append.
    Chunk { text: String },
    /// Terminal success. The payload, when present, is the authoritative
    /// final value; otherwise the accumulated chunks are.
    Done { final_text: Option<String> },
    /// Terminal failure reported by the backend.
    Failure { message: String },
}

impl StreamEvent {
    /// Returns true if this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Failure { .. })
    }
}

/// Parses a single line into an event.
///
/// Returns `None` for lines without the `data: ` prefix and for payloads that
/// fail to parse or match no known shape; malformed frames are recovered by
/// skipping, never surfaced.
pub fn parse_data_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    let value: Value = serde_json::from_str(payload.trim()).ok()?;
    classify_payload(&value)
}

/// Classifies a parsed payload by field shape.
///
/// Field precedence mirrors the backend's emission order: status, chunk,
/// done, error. The `done` payload field name varies by operation (`summary`
/// for summarize, `answer` for follow-up); both map to the same semantics.
fn classify_payload(value: &Value) -> Option<StreamEvent> {
    if is_set(value.get("status"))
        && let Some(message) = value.get("message").and_then(Value::as_str)
    {
        return Some(StreamEvent::Status {
            message: message.to_string(),
        });
    }

    if let Some(text) = value.get("chunk").and_then(Value::as_str) {
        return Some(StreamEvent::Chunk {
            text: text.to_string(),
        });
    }

    if is_set(value.get("done")) {
        let final_text = value
            .get("summary")
            .or_else(|| value.get("answer"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Some(StreamEvent::Done { final_text });
    }

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        return Some(StreamEvent::Failure { message });
    }

    None
}

/// Truthiness test for a marker field: absent, null, false, and "" all count
/// as unset (the backend emits `status` as both a bool and a string tag).
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Stream adapter turning raw transport fragments into `StreamEvent`s.
///
/// Fragments arrive arbitrarily chunked and are not aligned to line
/// boundaries; complete lines are drained from an internal buffer and a
/// trailing partial line waits for more input. At stream end a final
/// unterminated line is still processed, so framing is invariant under any
/// byte-boundary split of the input.
#[derive(Debug)]
pub struct StreamFrameParser<S> {
    inner: S,
    buffer: Vec<u8>,
    exhausted: bool,
}

impl<S> StreamFrameParser<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            exhausted: false,
        }
    }

    /// Drains the next recognizable event from buffered lines.
    ///
    /// With `at_end` set, a trailing line without a newline is consumed too.
    fn next_buffered_event(&mut self, at_end: bool) -> Option<StreamEvent> {
        loop {
            let line = match self.buffer.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    line
                }
                None if at_end && !self.buffer.is_empty() => std::mem::take(&mut self.buffer),
                None => return None,
            };

            let text = String::from_utf8_lossy(&line);
            match parse_data_line(&text) {
                Some(event) => return Some(event),
                None => {
                    if !text.trim().is_empty() {
                        tracing::debug!(line = %text, "skipping unrecognized stream line");
                    }
                }
            }
        }
    }
}

impl<S, E> Stream for StreamFrameParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ServiceResult<StreamEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        loop {
            let at_end = self.exhausted;
            if let Some(event) = self.next_buffered_event(at_end) {
                return Poll::Ready(Some(Ok(event)));
            }
            if self.exhausted {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ServiceError::stream(format!(
                        "stream transport error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    self.exhausted = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    const WIRE_STREAM: &str = concat!(
        "data: {\"status\": true, \"message\": \"AI is processing your request...\"}\n",
        "data: {\"chunk\": \"Hel\"}\n",
        "data: {\"chunk\": \"lo\"}\n",
        "data: {\"done\": true, \"summary\": \"Hello\", \"model\": \"gpt-4o\"}\n",
    );

    fn expected_events() -> Vec<StreamEvent> {
        vec![
            StreamEvent::Status {
                message: "AI is processing your request...".to_string(),
            },
            StreamEvent::Chunk {
                text: "Hel".to_string(),
            },
            StreamEvent::Chunk {
                text: "lo".to_string(),
            },
            StreamEvent::Done {
                final_text: Some("Hello".to_string()),
            },
        ]
    }

    fn byte_stream(
        chunks: Vec<&[u8]>,
    ) -> impl Stream<Item = std::result::Result<bytes::Bytes, std::io::Error>> {
        let owned: Vec<_> = chunks
            .into_iter()
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        futures_util::stream::iter(owned)
    }

    async fn collect_events(chunks: Vec<&[u8]>) -> Vec<StreamEvent> {
        let mut parser = StreamFrameParser::new(byte_stream(chunks));
        let mut events = Vec::new();
        while let Some(result) = parser.next().await {
            events.push(result.expect("expected valid event"));
        }
        events
    }

    #[tokio::test]
    async fn test_parses_whole_stream() {
        let events = collect_events(vec![WIRE_STREAM.as_bytes()]).await;
        assert_eq!(events, expected_events());
    }

    #[tokio::test]
    async fn test_framing_is_fragmentation_invariant() {
        let bytes = WIRE_STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let events = collect_events(vec![&bytes[..split], &bytes[split..]]).await;
            assert_eq!(events, expected_events(), "split at byte {split}");
        }
    }

    #[tokio::test]
    async fn test_single_byte_fragments() {
        let chunks: Vec<&[u8]> = WIRE_STREAM.as_bytes().chunks(1).collect();
        let events = collect_events(chunks).await;
        assert_eq!(events, expected_events());
    }

    #[tokio::test]
    async fn test_scenario_fragment_split_mid_payload() {
        // Fragment boundary inside the chunk payload, terminal line unsplit.
        let events = collect_events(vec![
            b"data: {\"chunk\": \"Hel",
            b"lo\"}\ndata: {\"done\": true, \"summary\": \"Hello\"}\n",
        ])
        .await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk {
                    text: "Hello".to_string()
                },
                StreamEvent::Done {
                    final_text: Some("Hello".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_final_line_without_newline_is_processed() {
        let events = collect_events(vec![b"data: {\"done\": true}"]).await;
        assert_eq!(events, vec![StreamEvent::Done { final_text: None }]);
    }

    #[tokio::test]
    async fn test_malformed_and_blank_lines_are_skipped() {
        let wire = concat!(
            "\n",
            ": keepalive comment\n",
            "data: {\"chunk\": \"a\"\n", // truncated JSON
            "data: not json at all\n",
            "data: {\"unknown\": 1}\n",
            "data: {\"chunk\": \"ok\"}\n",
            "data: {\"done\": true, \"answer\": \"ok\"}\n",
        );
        let events = collect_events(vec![wire.as_bytes()]).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk {
                    text: "ok".to_string()
                },
                StreamEvent::Done {
                    final_text: Some("ok".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let wire = "data: {\"chunk\": \"x\"}\r\ndata: {\"done\": true}\r\n";
        let events = collect_events(vec![wire.as_bytes()]).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk {
                    text: "x".to_string()
                },
                StreamEvent::Done { final_text: None },
            ]
        );
    }

    #[tokio::test]
    async fn test_error_payload_yields_failure() {
        let wire = "data: {\"error\": \"Gemini API error: quota exceeded\"}\n";
        let events = collect_events(vec![wire.as_bytes()]).await;
        assert_eq!(
            events,
            vec![StreamEvent::Failure {
                message: "Gemini API error: quota exceeded".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_status_as_string_tag() {
        // The backend emits status both as a bool and as a string tag.
        let wire = "data: {\"status\": \"thinking\", \"message\": \"Generating response...\"}\n";
        let events = collect_events(vec![wire.as_bytes()]).await;
        assert_eq!(
            events,
            vec![StreamEvent::Status {
                message: "Generating response...".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_as_stream_error() {
        let chunks: Vec<std::result::Result<bytes::Bytes, std::io::Error>> = vec![
            Ok(bytes::Bytes::from_static(b"data: {\"chunk\": \"a\"}\n")),
            Err(std::io::Error::other("connection reset")),
        ];
        let mut parser = StreamFrameParser::new(futures_util::stream::iter(chunks));

        let first = parser.next().await.unwrap().unwrap();
        assert_eq!(
            first,
            StreamEvent::Chunk {
                text: "a".to_string()
            }
        );
        let err = parser.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind, crate::backend::ServiceErrorKind::Stream);
        assert!(err.message.contains("connection reset"));
    }

    #[test]
    fn test_done_prefers_summary_then_answer() {
        let event = parse_data_line(r#"data: {"done": true, "answer": "A"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Done {
                final_text: Some("A".to_string())
            }
        );
    }

    #[test]
    fn test_non_data_line_is_not_an_event() {
        assert_eq!(parse_data_line(r#"{"chunk": "x"}"#), None);
        assert_eq!(parse_data_line("event: message"), None);
    }
}
