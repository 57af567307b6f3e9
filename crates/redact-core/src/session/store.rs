//! The session store: all reactive state in one explicit struct.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::input_mode::InputModeArbiter;
use super::ledger::ConversationLedger;
use super::selection::EntitySelectionSet;

/// How the live document entered the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    File,
    Pasted,
}

/// The single live document. Created on successful ingestion, replaced
/// wholesale on reset or a new ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source: SourceKind,
    pub text: String,
}

/// Session state owned exclusively by the controller.
///
/// The generation counter is the staleness token for in-flight streams: it
/// increases monotonically on reset and on each new ingestion, and guarded
/// mutations compare against the generation captured at request time.
#[derive(Debug, Default)]
pub struct SessionStore {
    generation: u64,
    pub input: InputModeArbiter,
    /// Proxy state for the FILE ingestion path.
    pub selected_file: Option<String>,
    /// Proxy state for the PASTED_TEXT ingestion path.
    pub pasted_text: String,
    pub document: Option<Document>,
    /// Separate artifact of entity-based redaction; never aliases the
    /// document text.
    pub redacted_text: Option<String>,
    /// Last extraction result, category to ordered values.
    pub entities: BTreeMap<String, Vec<String>>,
    pub selection: EntitySelectionSet,
    pub ledger: ConversationLedger,
    pub summary: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Installs a freshly ingested document, reinitializing the conversation
    /// and discarding everything derived from the previous one. Bumps the
    /// generation: in-flight streams from before the ingestion are stale.
    pub fn install_document(&mut self, source: SourceKind, text: String) {
        self.ledger.initialize(text.clone());
        self.document = Some(Document { source, text });
        self.discard_derived();
        self.generation += 1;
    }

    /// Drops the document and everything derived from it, keeping the input
    /// proxies and generation. Used when a new file selection displaces the
    /// current document before re-ingestion.
    pub fn discard_document(&mut self) {
        self.document = None;
        self.ledger.clear();
        self.discard_derived();
    }

    fn discard_derived(&mut self) {
        self.entities.clear();
        self.selection.clear();
        self.redacted_text = None;
        self.summary = None;
    }

    /// The text summarization operates on: the redacted artifact when
    /// present, else the document text.
    pub fn working_text(&self) -> Option<&str> {
        self.redacted_text
            .as_deref()
            .or_else(|| self.document.as_ref().map(|d| d.text.as_str()))
    }

    pub fn document_text(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.text.as_str())
    }

    /// Discards the whole session state and bumps the generation so any
    /// in-flight stream becomes stale.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_document_reinitializes_conversation() {
        let mut store = SessionStore::new();
        store.install_document(SourceKind::Pasted, "hello world".to_string());

        assert_eq!(store.document_text(), Some("hello world"));
        assert_eq!(store.ledger.len(), 1);
        assert_eq!(store.ledger.turns()[0].content, "hello world");
    }

    #[test]
    fn test_install_document_discards_derived_state_and_bumps_generation() {
        let mut store = SessionStore::new();
        store.install_document(SourceKind::File, "first".to_string());
        store.entities.insert("PERSON".to_string(), vec!["Alice".to_string()]);
        store.selection.toggle("PERSON", "Alice");
        store.redacted_text = Some("[REDACTED]".to_string());
        store.summary = Some("a summary".to_string());
        let generation = store.generation();

        store.install_document(SourceKind::Pasted, "second".to_string());

        assert_eq!(store.generation(), generation + 1);
        assert!(store.entities.is_empty());
        assert!(store.selection.is_empty());
        assert_eq!(store.redacted_text, None);
        assert_eq!(store.summary, None);
        assert_eq!(store.ledger.len(), 1);
    }

    #[test]
    fn test_working_text_prefers_redacted_artifact() {
        let mut store = SessionStore::new();
        assert_eq!(store.working_text(), None);

        store.install_document(SourceKind::Pasted, "original".to_string());
        assert_eq!(store.working_text(), Some("original"));

        store.redacted_text = Some("redacted".to_string());
        assert_eq!(store.working_text(), Some("redacted"));
    }

    #[test]
    fn test_reset_discards_everything_but_advances_generation() {
        let mut store = SessionStore::new();
        store.install_document(SourceKind::File, "doc".to_string());
        store.selected_file = Some("doc.txt".to_string());
        store.pasted_text = "leftover".to_string();
        let generation = store.generation();

        store.reset();

        assert_eq!(store.generation(), generation + 1);
        assert!(store.document.is_none());
        assert!(store.ledger.is_empty());
        assert!(store.selected_file.is_none());
        assert!(store.pasted_text.is_empty());
    }
}
