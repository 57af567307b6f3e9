//! Mutual exclusion between the two ingestion paths.
//!
//! The UI exposes both affordances (file selection and a paste box) at once;
//! this machine replaces the scattered boolean checks with one explicit
//! 3-state arbiter. Transitions report which competing proxy buffer the
//! caller must clear; the arbiter never mutates session state itself.

use std::fmt;

use crate::backend::{ServiceError, ServiceResult};

/// Which ingestion path currently holds the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    None,
    File,
    PastedText,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::None => write!(f, "none"),
            InputMode::File => write!(f, "file"),
            InputMode::PastedText => write!(f, "pasted-text"),
        }
    }
}

/// Proxy buffer the caller must clear after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleared {
    PastedText,
    FileSelection,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputModeArbiter {
    mode: InputMode,
}

impl InputModeArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// A file selection forces FILE mode. Reports the pasted-text buffer for
    /// clearing when the pasted path held the session. FILE -> FILE
    /// (re-selecting) is allowed and reports nothing.
    pub fn select_file(&mut self) -> Option<Cleared> {
        let cleared = (self.mode == InputMode::PastedText).then_some(Cleared::PastedText);
        self.mode = InputMode::File;
        cleared
    }

    /// Non-empty pasted text forces PASTED_TEXT mode, reporting the file
    /// selection for clearing when the file path held the session. Emptying
    /// the buffer while in PASTED_TEXT reverts to NONE.
    pub fn enter_pasted_text(&mut self, non_empty: bool) -> Option<Cleared> {
        if non_empty {
            let cleared = (self.mode == InputMode::File).then_some(Cleared::FileSelection);
            self.mode = InputMode::PastedText;
            cleared
        } else {
            if self.mode == InputMode::PastedText {
                self.mode = InputMode::None;
            }
            None
        }
    }

    pub fn reset(&mut self) {
        self.mode = InputMode::None;
    }

    /// Gates an ingestion action: the current mode must match and the
    /// competing path's proxy buffer must be empty (defense in depth beyond
    /// the mode flag).
    pub fn authorize(
        &self,
        required: InputMode,
        competing_buffer_empty: bool,
    ) -> ServiceResult<()> {
        if self.mode != required {
            return Err(ServiceError::wrong_mode(format!(
                "requires {required} input mode, but the session is in {} mode",
                self.mode
            )));
        }
        if !competing_buffer_empty {
            return Err(ServiceError::wrong_mode(
                "the competing input buffer is not empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ServiceErrorKind;

    #[test]
    fn test_select_file_from_none() {
        let mut arbiter = InputModeArbiter::new();
        assert_eq!(arbiter.select_file(), None);
        assert_eq!(arbiter.mode(), InputMode::File);
    }

    #[test]
    fn test_pasted_text_displaces_file_selection() {
        let mut arbiter = InputModeArbiter::new();
        arbiter.select_file();

        let cleared = arbiter.enter_pasted_text(true);
        assert_eq!(cleared, Some(Cleared::FileSelection));
        assert_eq!(arbiter.mode(), InputMode::PastedText);
    }

    #[test]
    fn test_file_selection_displaces_pasted_text() {
        let mut arbiter = InputModeArbiter::new();
        arbiter.enter_pasted_text(true);

        let cleared = arbiter.select_file();
        assert_eq!(cleared, Some(Cleared::PastedText));
        assert_eq!(arbiter.mode(), InputMode::File);
    }

    #[test]
    fn test_reselecting_a_file_reports_nothing() {
        let mut arbiter = InputModeArbiter::new();
        arbiter.select_file();
        assert_eq!(arbiter.select_file(), None);
        assert_eq!(arbiter.mode(), InputMode::File);
    }

    #[test]
    fn test_emptying_pasted_text_reverts_to_none() {
        let mut arbiter = InputModeArbiter::new();
        arbiter.enter_pasted_text(true);
        assert_eq!(arbiter.enter_pasted_text(false), None);
        assert_eq!(arbiter.mode(), InputMode::None);

        // Empty input in other modes changes nothing.
        arbiter.select_file();
        arbiter.enter_pasted_text(false);
        assert_eq!(arbiter.mode(), InputMode::File);
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut arbiter = InputModeArbiter::new();
        arbiter.enter_pasted_text(true);
        arbiter.reset();
        assert_eq!(arbiter.mode(), InputMode::None);
    }

    #[test]
    fn test_authorize_wrong_mode() {
        let mut arbiter = InputModeArbiter::new();
        arbiter.enter_pasted_text(true);

        let err = arbiter.authorize(InputMode::File, true).unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::WrongMode);
        assert!(arbiter.authorize(InputMode::PastedText, true).is_ok());
    }

    #[test]
    fn test_authorize_rejects_non_empty_competing_buffer() {
        let mut arbiter = InputModeArbiter::new();
        arbiter.select_file();

        let err = arbiter.authorize(InputMode::File, false).unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::WrongMode);
    }
}
