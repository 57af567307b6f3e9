//! HTTP client for the redaction backend.
//!
//! The backend is an external collaborator: entity extraction, redaction
//! substitution, summarization, follow-up chat, and deanonymization all live
//! server-side. This module only ferries requests and decodes responses; the
//! streaming endpoints hand back a [`StreamFrameParser`] over the raw byte
//! stream.

mod error;
mod types;

use std::collections::BTreeMap;
use std::pin::Pin;

use futures_util::Stream;
use reqwest::multipart;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use error::{ServiceError, ServiceErrorKind, ServiceResult};
pub use types::{
    DeanonymizeRequest, DeanonymizeResponse, EntitiesRequest, EntitiesResponse, FollowUpStreamRequest,
    KeyStatus, ProcessTextRequest, ProcessTextResponse, RedactRequest, RedactResponse,
    SummarizeStreamRequest, UploadResponse,
};

use crate::session::ConversationTurn;
use crate::stream::{StreamEvent, StreamFrameParser};

/// Backend base URL used when neither config nor environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Boxed stream of decoded events from a streaming endpoint.
pub type EventStream = Pin<Box<dyn Stream<Item = ServiceResult<StreamEvent>> + Send>>;

/// Client for the redaction backend.
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    /// Creates a client against the given base URL.
    ///
    /// # Panics
    /// - In test builds, panics if `base_url` is the default local backend;
    ///   tests must point at a mock server.
    /// - At runtime, panics if `REDACT_BLOCK_REAL_BACKEND=1` and `base_url`
    ///   is the default local backend (set by the integration test harness).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        #[cfg(test)]
        if base_url == DEFAULT_BASE_URL {
            panic!(
                "Tests must not use the default backend URL!\n\
                 Point the client at a mock server (e.g., wiremock).\n\
                 Found base_url: {}",
                base_url
            );
        }

        #[cfg(not(test))]
        if std::env::var("REDACT_BLOCK_REAL_BACKEND").is_ok_and(|v| v == "1")
            && base_url == DEFAULT_BASE_URL
        {
            panic!(
                "REDACT_BLOCK_REAL_BACKEND=1 but trying to use the default backend URL!\n\
                 Point the client at a mock server."
            );
        }

        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Uploads raw file bytes; the backend extracts and cleans plain text.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> ServiceResult<UploadResponse> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        Self::read_json(response).await
    }

    /// Submits pasted text for cleaning and stored-redaction application.
    pub async fn process_text(&self, text: &str) -> ServiceResult<ProcessTextResponse> {
        self.post_json("/process-text", &ProcessTextRequest { text })
            .await
    }

    /// Extracts entities from the document text.
    pub async fn entities(&self, text: &str) -> ServiceResult<EntitiesResponse> {
        self.post_json("/entities", &EntitiesRequest { text }).await
    }

    /// Requests redaction of `text`, by entity mapping or by ad-hoc spans.
    pub async fn redact(
        &self,
        text: &str,
        entities: &BTreeMap<String, Vec<String>>,
        custom_entities: &[String],
    ) -> ServiceResult<RedactResponse> {
        self.post_json(
            "/redact",
            &RedactRequest {
                text,
                entities,
                custom_entities,
            },
        )
        .await
    }

    /// Restores previously anonymized text.
    pub async fn deanonymize(&self, text: &str) -> ServiceResult<DeanonymizeResponse> {
        self.post_json("/deanonymize", &DeanonymizeRequest { text })
            .await
    }

    /// Probes which provider credentials the backend holds.
    pub async fn check_keys(&self) -> ServiceResult<KeyStatus> {
        let response = self
            .http
            .get(format!("{}/api/check-keys", self.base_url))
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        Self::read_json(response).await
    }

    /// Opens the summarization event stream.
    pub async fn summarize_stream(&self, text: &str, model: &str) -> ServiceResult<EventStream> {
        self.open_stream("/summarize-stream", &SummarizeStreamRequest { text, model })
            .await
    }

    /// Opens the follow-up answering event stream.
    pub async fn followup_stream(
        &self,
        history: &[ConversationTurn],
        question: &str,
        model: &str,
    ) -> ServiceResult<EventStream> {
        self.open_stream(
            "/followup-stream",
            &FollowUpStreamRequest {
                history,
                question,
                model,
            },
        )
        .await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ServiceResult<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        Self::read_json(response).await
    }

    async fn open_stream(&self, path: &str, body: &impl Serialize) -> ServiceResult<EventStream> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ServiceError::http_status(status.as_u16(), &error_body));
        }

        let byte_stream = response.bytes_stream();
        Ok(Box::pin(StreamFrameParser::new(byte_stream)))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ServiceResult<T> {
        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ServiceError::http_status(status.as_u16(), &error_body));
        }
        response
            .json()
            .await
            .map_err(|e| ServiceError::transport(format!("Failed to decode response: {e}")))
    }
}

/// Classifies a reqwest error into a transport error.
fn classify_reqwest_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::transport(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ServiceError::transport(format!("Connection failed: {e}"))
    } else {
        ServiceError::transport(format!("Network error: {e}"))
    }
}
