//! Fold of a `StreamEvent` sequence into a single outcome.
//!
//! The same fold serves both streaming operations (summarize and follow-up);
//! nothing here knows which request produced the stream.

use futures_util::{Stream, StreamExt};

use super::frame::StreamEvent;
use crate::backend::ServiceResult;

/// Net result of folding one event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Concatenation of every `Chunk` seen before termination.
    pub accumulated: String,
    /// Explicit final value carried by the `Done` event, if any.
    pub final_text: Option<String>,
    /// Failure message; set by a `Failure` event, a transport error, or a
    /// stream that ended without a terminal event.
    pub failure: Option<String>,
}

impl StreamOutcome {
    /// The authoritative result text: the explicit final value when present,
    /// else the accumulated buffer. `None` on failure, since failed outcomes
    /// carry no usable text.
    pub fn text(&self) -> Option<&str> {
        if self.failure.is_some() {
            return None;
        }
        Some(self.final_text.as_deref().unwrap_or(&self.accumulated))
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Done(Option<String>),
    Failure(String),
}

/// Incremental folder of stream events.
///
/// `apply` returns the new display text whenever it changed, so callers can
/// publish live partial progress; `finish` yields the `StreamOutcome`,
/// treating a missing terminal event as a failure.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    accumulated: String,
    terminal: Option<Terminal>,
}

/// Failure message used when a stream ends without `Done` or `Failure`.
pub const UNEXPECTED_END: &str = "stream ended unexpectedly";

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event, in arrival order. Events after a terminal one are
    /// ignored. Returns display text to publish, if any: a `Status` message
    /// overwrites the display, a `Chunk` makes the growing buffer the
    /// display, and a `Done` resolves the final text. A `Failure` discards
    /// the display.
    pub fn apply(&mut self, event: StreamEvent) -> Option<String> {
        if self.terminal.is_some() {
            return None;
        }
        match event {
            StreamEvent::Status { message } => Some(message),
            StreamEvent::Chunk { text } => {
                self.accumulated.push_str(&text);
                Some(self.accumulated.clone())
            }
            StreamEvent::Done { final_text } => {
                let display = final_text
                    .clone()
                    .unwrap_or_else(|| self.accumulated.clone());
                self.terminal = Some(Terminal::Done(final_text));
                Some(display)
            }
            StreamEvent::Failure { message } => {
                self.terminal = Some(Terminal::Failure(message));
                None
            }
        }
    }

    /// Records an out-of-band failure (e.g., a transport error mid-stream).
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.terminal.is_none() {
            self.terminal = Some(Terminal::Failure(message.into()));
        }
    }

    /// Finalizes the fold. A stream that never produced a terminal event is
    /// itself a failure.
    pub fn finish(self) -> StreamOutcome {
        match self.terminal {
            Some(Terminal::Done(final_text)) => StreamOutcome {
                accumulated: self.accumulated,
                final_text,
                failure: None,
            },
            Some(Terminal::Failure(message)) => StreamOutcome {
                accumulated: String::new(),
                final_text: None,
                failure: Some(message),
            },
            None => StreamOutcome {
                accumulated: String::new(),
                final_text: None,
                failure: Some(UNEXPECTED_END.to_string()),
            },
        }
    }
}

/// Drives a parsed event stream to completion, publishing each display
/// update through `on_progress`, and returns the outcome.
///
/// Stops at the first terminal event; later events from the transport are
/// left unread.
pub async fn drain_outcome<S>(
    mut stream: S,
    mut on_progress: impl FnMut(&str),
) -> StreamOutcome
where
    S: Stream<Item = ServiceResult<StreamEvent>> + Unpin,
{
    let mut accumulator = StreamAccumulator::new();
    while let Some(next) = stream.next().await {
        match next {
            Ok(event) => {
                let terminal = event.is_terminal();
                if let Some(display) = accumulator.apply(event) {
                    on_progress(&display);
                }
                if terminal {
                    break;
                }
            }
            Err(err) => {
                accumulator.fail(err.to_string());
                break;
            }
        }
    }
    accumulator.finish()
}
