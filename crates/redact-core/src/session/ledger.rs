//! Conversation transcript for follow-up questioning.
//!
//! Turn 0, when present, is a USER turn holding the document as currently
//! known. It is the only turn ever mutated after creation: it is rebased to
//! the latest document text before each follow-up request. Everything after
//! index 0 is append-only.

use serde::{Deserialize, Serialize};

use crate::backend::{ServiceError, ServiceResult};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation, in the backend's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered sequence of conversation turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLedger {
    turns: Vec<ConversationTurn>,
}

impl ConversationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the ledger to a single USER turn holding the document text.
    pub fn initialize(&mut self, document_text: impl Into<String>) {
        self.turns = vec![ConversationTurn::user(document_text)];
    }

    /// Replaces turn 0's content in place, leaving every other turn and the
    /// ledger's length untouched.
    pub fn rebase_first_turn(&mut self, new_text: &str) -> ServiceResult<()> {
        let first = self
            .turns
            .first_mut()
            .ok_or_else(|| ServiceError::invalid_state("conversation has no document turn"))?;
        first.content = new_text.to_string();
        Ok(())
    }

    /// Appends a USER question and its ASSISTANT answer.
    pub fn append_exchange(&mut self, question: &str, answer: &str) -> ServiceResult<()> {
        if self.turns.is_empty() {
            return Err(ServiceError::invalid_state(
                "conversation has no document context",
            ));
        }
        self.turns.push(ConversationTurn::user(question));
        self.turns.push(ConversationTurn::assistant(answer));
        Ok(())
    }

    /// Returns a copy of the transcript with turn 0 already rebased to the
    /// given document text. The live ledger is not modified: the rebase sent
    /// over the wire must not become visible until the exchange commits, so a
    /// failed request cannot corrupt history.
    pub fn snapshot_for_request(&self, current_text: &str) -> ServiceResult<Vec<ConversationTurn>> {
        if self.turns.is_empty() {
            return Err(ServiceError::invalid_state(
                "conversation has no document context",
            ));
        }
        let mut snapshot = self.turns.clone();
        snapshot[0].content = current_text.to_string();
        Ok(snapshot)
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ServiceErrorKind;

    fn populated() -> ConversationLedger {
        let mut ledger = ConversationLedger::new();
        ledger.initialize("the document");
        ledger.append_exchange("first question", "first answer").unwrap();
        ledger
    }

    #[test]
    fn test_initialize_discards_history() {
        let mut ledger = populated();
        assert_eq!(ledger.len(), 3);

        ledger.initialize("a new document");
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.turns()[0], ConversationTurn::user("a new document"));
    }

    #[test]
    fn test_rebase_touches_only_turn_zero() {
        let mut ledger = populated();
        let before = ledger.clone();

        ledger.rebase_first_turn("redacted document").unwrap();

        assert_eq!(ledger.len(), before.len());
        assert_eq!(ledger.turns()[0].role, Role::User);
        assert_eq!(ledger.turns()[0].content, "redacted document");
        assert_eq!(ledger.turns()[1..], before.turns()[1..]);
    }

    #[test]
    fn test_rebase_on_empty_ledger_is_invalid_state() {
        let mut ledger = ConversationLedger::new();
        let err = ledger.rebase_first_turn("text").unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::InvalidState);
    }

    #[test]
    fn test_append_exchange_requires_document_turn() {
        let mut ledger = ConversationLedger::new();
        let err = ledger.append_exchange("q", "a").unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::InvalidState);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_append_exchange_order_and_roles() {
        let mut ledger = populated();
        ledger.append_exchange("second question", "second answer").unwrap();

        let turns = ledger.turns();
        assert_eq!(turns[3], ConversationTurn::user("second question"));
        assert_eq!(turns[4], ConversationTurn::assistant("second answer"));
    }

    #[test]
    fn test_snapshot_rebases_copy_not_live_ledger() {
        let ledger = populated();
        let snapshot = ledger.snapshot_for_request("latest text").unwrap();

        assert_eq!(snapshot[0].content, "latest text");
        assert_eq!(snapshot[1..], ledger.turns()[1..]);
        // The live ledger keeps its original turn 0 until the exchange commits.
        assert_eq!(ledger.turns()[0].content, "the document");
    }

    #[test]
    fn test_snapshot_on_empty_ledger_is_invalid_state() {
        let ledger = ConversationLedger::new();
        let err = ledger.snapshot_for_request("text").unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::InvalidState);
    }

    #[test]
    fn test_turn_wire_shape() {
        let turn = ConversationTurn::assistant("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
