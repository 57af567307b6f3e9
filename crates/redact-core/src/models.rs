//! Model catalog for the backend's LLM operations.
//!
//! The backend resolves these display labels to concrete provider model IDs;
//! the client only ships the label in summarize/follow-up requests.

/// Labels accepted by the backend's `model` request field.
pub const MODEL_LABELS: &[&str] = &[
    "GPT-4o",
    "GPT-4.1 Mini (2025-04-14)",
    "GPT-4.5 Preview",
    "GPT-4.1 (2025-04-14)",
    "GPT-4.1 Nano (2025-04-14)",
    "Gemini 2.5 Pro",
    "Gemini 2.5 Flash",
];

/// Label used when the config names none.
pub const DEFAULT_MODEL: &str = "GPT-4o";

/// Returns true if the label is in the known catalog. Unknown labels are
/// still sent as-is (the backend falls back to treating the label as a raw
/// model ID), so this is advisory.
pub fn is_known_model(label: &str) -> bool {
    MODEL_LABELS.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_in_catalog() {
        assert!(is_known_model(DEFAULT_MODEL));
    }

    #[test]
    fn test_unknown_label() {
        assert!(!is_known_model("gpt-9-experimental"));
    }
}
