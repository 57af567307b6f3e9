//! Session orchestration against the redaction backend.
//!
//! The controller owns the [`SessionStore`] and is the only writer to it.
//! Streaming operations are decomposed into a ticket lifecycle (begin
//! captures the generation and request inputs, then open the stream, publish
//! progress, commit) so the stale-stream discard rule is enforced on every
//! mutation path and testable without a transport.

use tokio::sync::mpsc;

use super::input_mode::{Cleared, InputMode};
use super::ledger::ConversationTurn;
use super::store::{SessionStore, SourceKind};
use crate::backend::{
    BackendClient, EventStream, KeyStatus, ServiceError, ServiceResult,
};
use crate::stream::{StreamOutcome, drain_outcome};

use std::collections::BTreeMap;

/// Live progress published while a streaming operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Partial display text for the summarize operation.
    SummaryProgress { text: String },
    /// Final committed summary.
    SummaryReady { text: String },
    /// Partial display text for a follow-up answer.
    AnswerProgress { text: String },
    /// Final committed answer to the given question.
    AnswerReady { question: String, text: String },
}

/// Best-effort sender for session updates. Drivers that don't care simply
/// drop the receiver; sends to a closed channel are ignored.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl UpdateSender {
    pub fn send(&self, update: SessionUpdate) {
        let _ = self.tx.send(update);
    }
}

pub type UpdateReceiver = mpsc::UnboundedReceiver<SessionUpdate>;

/// Creates the update channel a controller publishes through.
pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UpdateSender { tx }, rx)
}

/// Whether a guarded mutation was applied or discarded as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Applied,
    Stale,
}

/// Capture of the session generation and request inputs for one summarize
/// stream. Events from a stream whose ticket no longer matches the live
/// generation are discarded without mutating session state.
#[derive(Debug, Clone)]
pub struct SummaryTicket {
    generation: u64,
    /// Text to summarize, captured at request time.
    pub text: String,
}

/// Capture of the session generation and request inputs for one follow-up
/// stream.
#[derive(Debug, Clone)]
pub struct FollowUpTicket {
    generation: u64,
    pub question: String,
    /// Transcript snapshot with turn 0 already rebased to the document text
    /// at request time. The live ledger stays untouched until commit.
    pub history: Vec<ConversationTurn>,
}

/// Orchestrates the session state machine against the backend collaborator.
pub struct SessionController {
    client: BackendClient,
    store: SessionStore,
    model: String,
    updates: UpdateSender,
}

impl SessionController {
    /// Creates a controller and the receiver for its progress updates.
    pub fn new(client: BackendClient, model: impl Into<String>) -> (Self, UpdateReceiver) {
        let (updates, rx) = update_channel();
        (
            Self {
                client,
                store: SessionStore::new(),
                model: model.into(),
                updates,
            },
            rx,
        )
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    // === Input arbitration ===

    /// Records a file selection. Forces FILE mode, clears the pasted-text
    /// buffer when the pasted path held the session, and discards any live
    /// document so the ingestion that follows starts clean.
    pub fn select_file(&mut self, name: &str) {
        if let Some(Cleared::PastedText) = self.store.input.select_file() {
            self.store.pasted_text.clear();
        }
        self.store.selected_file = Some(name.to_string());
        if self.store.document.is_some() {
            self.store.discard_document();
        }
    }

    /// Records pasted-text input. Non-empty text forces PASTED_TEXT mode and
    /// clears any file selection; emptying the buffer releases the mode.
    /// Rejected once a document is live: the paste box stays disabled until
    /// reset.
    pub fn enter_pasted_text(&mut self, text: &str) -> ServiceResult<()> {
        if self.store.document.is_some() {
            return Err(ServiceError::invalid_state(
                "a document is already loaded; reset the session to paste new text",
            ));
        }
        let non_empty = !text.trim().is_empty();
        if let Some(Cleared::FileSelection) = self.store.input.enter_pasted_text(non_empty) {
            self.store.selected_file = None;
        }
        self.store.pasted_text = text.to_string();
        Ok(())
    }

    // === Ingestion ===

    /// Processes the selected file: the backend extracts plain text, which
    /// becomes the live document and the conversation's first turn.
    pub async fn process_file(&mut self, bytes: Vec<u8>) -> ServiceResult<String> {
        self.store
            .input
            .authorize(InputMode::File, self.store.pasted_text.trim().is_empty())?;
        let name = self
            .store
            .selected_file
            .clone()
            .ok_or_else(|| ServiceError::invalid_state("no file selected"))?;

        let response = self.client.upload(&name, bytes).await?;
        tracing::debug!(file = %response.filename, bytes = response.text.len(), "document ingested");
        self.store.install_document(SourceKind::File, response.text);
        Ok(self.store.document_text().unwrap_or_default().to_string())
    }

    /// Processes the pasted-text buffer through the backend's cleaning path.
    pub async fn process_pasted_text(&mut self) -> ServiceResult<String> {
        self.store
            .input
            .authorize(InputMode::PastedText, self.store.selected_file.is_none())?;

        let pasted = self.store.pasted_text.clone();
        let response = self.client.process_text(&pasted).await?;
        self.store.install_document(SourceKind::Pasted, response.text);
        Ok(self.store.document_text().unwrap_or_default().to_string())
    }

    // === Entities & redaction ===

    /// Extracts entities from the live document, replacing the previous map
    /// and clearing the selection.
    pub async fn extract_entities(&mut self) -> ServiceResult<BTreeMap<String, Vec<String>>> {
        let text = self
            .store
            .document_text()
            .ok_or_else(|| ServiceError::invalid_state("no document loaded"))?
            .to_string();

        let response = self.client.entities(&text).await?;
        self.store.entities = response.entities.clone();
        self.store.selection.clear();
        Ok(response.entities)
    }

    pub fn toggle_entity(&mut self, category: &str, value: &str) {
        self.store.selection.toggle(category, value);
    }

    pub fn is_entity_selected(&self, category: &str, value: &str) -> bool {
        self.store.selection.is_selected(category, value)
    }

    /// Bulk redaction: the full document text against the full selection.
    /// Produces the separate redacted-text artifact; the source document is
    /// not touched.
    pub async fn redact_selected_entities(&mut self) -> ServiceResult<String> {
        let text = self
            .store
            .document_text()
            .ok_or_else(|| ServiceError::invalid_state("no document loaded"))?
            .to_string();
        if self.store.selection.is_empty() {
            return Err(ServiceError::invalid_state("no entities selected"));
        }

        let payload = self.store.selection.to_request_payload();
        let response = self.client.redact(&text, &payload, &[]).await?;
        self.store.redacted_text = Some(response.redacted_text.clone());
        Ok(response.redacted_text)
    }

    /// Selection-driven re-redaction: exactly the chosen span, with an empty
    /// entity mapping. This is the one path where redaction mutates the
    /// source text; the response replaces the authoritative document. The
    /// entity selection is unaffected.
    pub async fn redact_span(&mut self, span: &str) -> ServiceResult<String> {
        let span = span.trim();
        if span.is_empty() {
            return Err(ServiceError::invalid_state("nothing selected to redact"));
        }
        let text = self
            .store
            .document_text()
            .ok_or_else(|| ServiceError::invalid_state("no document loaded"))?
            .to_string();

        let custom = [span.to_string()];
        let response = self.client.redact(&text, &BTreeMap::new(), &custom).await?;
        match self.store.document.as_mut() {
            Some(document) => document.text = response.redacted_text.clone(),
            None => {
                return Err(ServiceError::invalid_state(
                    "document disappeared during redaction",
                ));
            }
        }
        Ok(response.redacted_text)
    }

    // === Summarize ===

    /// Captures the inputs for a summarize stream. The redacted artifact is
    /// preferred over the original text when present.
    pub fn begin_summary(&self) -> ServiceResult<SummaryTicket> {
        let text = self
            .store
            .working_text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ServiceError::invalid_state("no text available to summarize"))?;
        Ok(SummaryTicket {
            generation: self.store.generation(),
            text: text.to_string(),
        })
    }

    pub async fn open_summary_stream(&self, ticket: &SummaryTicket) -> ServiceResult<EventStream> {
        self.client.summarize_stream(&ticket.text, &self.model).await
    }

    /// Publishes partial summary text, unless the ticket has gone stale.
    pub fn publish_summary_progress(&self, ticket: &SummaryTicket, text: &str) -> Commit {
        if ticket.generation != self.store.generation() {
            tracing::debug!("discarding summary progress from a stale stream");
            return Commit::Stale;
        }
        self.updates.send(SessionUpdate::SummaryProgress {
            text: text.to_string(),
        });
        Commit::Applied
    }

    /// Commits the summary outcome: stale streams are discarded, failed
    /// streams surface an error without touching state.
    pub fn commit_summary(
        &mut self,
        ticket: &SummaryTicket,
        outcome: StreamOutcome,
    ) -> ServiceResult<Commit> {
        if ticket.generation != self.store.generation() {
            tracing::debug!("discarding summary result from a stale stream");
            return Ok(Commit::Stale);
        }
        if let Some(failure) = outcome.failure {
            return Err(ServiceError::stream(failure));
        }
        let text = outcome
            .final_text
            .unwrap_or(outcome.accumulated);
        self.store.summary = Some(text.clone());
        self.updates.send(SessionUpdate::SummaryReady { text });
        Ok(Commit::Applied)
    }

    /// Streams a summary of the working text to completion.
    pub async fn summarize(&mut self) -> ServiceResult<String> {
        let ticket = self.begin_summary()?;
        let stream = self.open_summary_stream(&ticket).await?;
        let outcome = drain_outcome(stream, |text| {
            self.publish_summary_progress(&ticket, text);
        })
        .await;
        match self.commit_summary(&ticket, outcome)? {
            Commit::Applied => Ok(self.store.summary.clone().unwrap_or_default()),
            Commit::Stale => Err(ServiceError::stream(
                "summary discarded: the session changed mid-stream",
            )),
        }
    }

    // === Follow-up ===

    /// Captures the inputs for a follow-up stream: the question and a
    /// transcript snapshot rebased to the current document text.
    pub fn begin_follow_up(&self, question: &str) -> ServiceResult<FollowUpTicket> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::invalid_state("follow-up question is empty"));
        }
        let text = self
            .store
            .document_text()
            .ok_or_else(|| ServiceError::invalid_state("no document loaded"))?;
        let history = self.store.ledger.snapshot_for_request(text)?;
        Ok(FollowUpTicket {
            generation: self.store.generation(),
            question: question.to_string(),
            history,
        })
    }

    pub async fn open_follow_up_stream(
        &self,
        ticket: &FollowUpTicket,
    ) -> ServiceResult<EventStream> {
        self.client
            .followup_stream(&ticket.history, &ticket.question, &self.model)
            .await
    }

    /// Publishes partial answer text, unless the ticket has gone stale.
    pub fn publish_follow_up_progress(&self, ticket: &FollowUpTicket, text: &str) -> Commit {
        if ticket.generation != self.store.generation() {
            tracing::debug!("discarding follow-up progress from a stale stream");
            return Commit::Stale;
        }
        self.updates.send(SessionUpdate::AnswerProgress {
            text: text.to_string(),
        });
        Commit::Applied
    }

    /// Commits a follow-up outcome. Only now does the turn-zero rebase become
    /// visible in the live ledger, followed by the question/answer append.
    /// A failed or stale stream leaves history untouched.
    pub fn commit_follow_up(
        &mut self,
        ticket: &FollowUpTicket,
        outcome: StreamOutcome,
    ) -> ServiceResult<Commit> {
        if ticket.generation != self.store.generation() {
            tracing::debug!("discarding follow-up result from a stale stream");
            return Ok(Commit::Stale);
        }
        if let Some(failure) = outcome.failure {
            return Err(ServiceError::stream(failure));
        }
        let answer = outcome
            .final_text
            .unwrap_or(outcome.accumulated);

        self.store
            .ledger
            .rebase_first_turn(&ticket.history[0].content)?;
        self.store
            .ledger
            .append_exchange(&ticket.question, &answer)?;
        self.updates.send(SessionUpdate::AnswerReady {
            question: ticket.question.clone(),
            text: answer,
        });
        Ok(Commit::Applied)
    }

    /// Streams a follow-up answer to completion and commits it to the ledger.
    pub async fn follow_up(&mut self, question: &str) -> ServiceResult<String> {
        let ticket = self.begin_follow_up(question)?;
        let stream = self.open_follow_up_stream(&ticket).await?;
        let outcome = drain_outcome(stream, |text| {
            self.publish_follow_up_progress(&ticket, text);
        })
        .await;
        match self.commit_follow_up(&ticket, outcome)? {
            Commit::Applied => {
                let answer = self
                    .store
                    .ledger
                    .turns()
                    .last()
                    .map(|t| t.content.clone())
                    .unwrap_or_default();
                Ok(answer)
            }
            Commit::Stale => Err(ServiceError::stream(
                "answer discarded: the session changed mid-stream",
            )),
        }
    }

    // === Passthroughs ===

    /// Ferries a deanonymization request; the session holds no state for it.
    pub async fn deanonymize(&self, text: &str) -> ServiceResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::invalid_state("no anonymized text provided"));
        }
        Ok(self.client.deanonymize(text).await?.text)
    }

    /// Probes the backend's provider credential status.
    pub async fn check_keys(&self) -> ServiceResult<KeyStatus> {
        self.client.check_keys().await
    }

    // === Reset ===

    /// Discards the whole session. The only operation permitted to interrupt
    /// an in-flight stream: the generation bump makes its later events stale.
    pub fn reset(&mut self) {
        tracing::debug!("resetting session");
        self.store.reset();
    }
}
