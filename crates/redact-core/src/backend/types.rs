//! Request/response shapes of the redaction backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::ConversationTurn;

// === Requests ===

#[derive(Debug, Serialize)]
pub struct ProcessTextRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EntitiesRequest<'a> {
    pub text: &'a str,
}

/// Redaction request. Per the session's usage pattern, exactly one of
/// `entities` and `custom_entities` is non-empty: bulk redaction sends the
/// selection mapping, selection-driven re-redaction sends the ad-hoc spans.
#[derive(Debug, Serialize)]
pub struct RedactRequest<'a> {
    pub text: &'a str,
    pub entities: &'a BTreeMap<String, Vec<String>>,
    pub custom_entities: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct SummarizeStreamRequest<'a> {
    pub text: &'a str,
    pub model: &'a str,
}

#[derive(Debug, Serialize)]
pub struct FollowUpStreamRequest<'a> {
    pub history: &'a [ConversationTurn],
    pub question: &'a str,
    pub model: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DeanonymizeRequest<'a> {
    pub text: &'a str,
}

// === Responses ===

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    /// Extracted plain text, already cleaned by the backend.
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessTextResponse {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitiesResponse {
    /// Category to ordered sequence of detected values.
    pub entities: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedactResponse {
    pub redacted_text: String,
    /// Original value to anonymization tag, as applied by the backend.
    #[serde(default)]
    pub redaction_map: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeanonymizeResponse {
    pub text: String,
}

/// Which provider credentials the backend currently holds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct KeyStatus {
    pub openai_configured: bool,
    pub gemini_configured: bool,
}

impl KeyStatus {
    /// True when no provider is usable; LLM operations will fail until a key
    /// is configured server-side.
    pub fn is_unconfigured(&self) -> bool {
        !self.openai_configured && !self.gemini_configured
    }
}
