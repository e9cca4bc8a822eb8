//! Typed events emitted by the generation stream.
//!
//! Ordering contract: zero or more `Thought`/`ThoughtLine` events,
//! then exactly one terminal `Json` or `Error`, then the stream closes.

use serde_json::Value;

/// One event on a generation stream.
#[derive(Debug, Clone)]
pub enum GenEvent {
    /// Incremental planning text (no trailing newline implied).
    Thought(String),
    /// A whole line of operator-visible status text.
    ThoughtLine(String),
    /// Terminal success: the repaired, reference-resolved document.
    Json(Value),
    /// Terminal failure.
    Error(String),
}

impl GenEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenEvent::Json(_) | GenEvent::Error(_))
    }

    /// Wire representation: `(event name, payload)`.
    ///
    /// Errors travel as an `ERROR:`-prefixed `thoughtln` payload, so
    /// the wire carries exactly three event names.
    pub fn wire_parts(&self) -> (&'static str, String) {
        match self {
            GenEvent::Thought(text) => ("thought", text.clone()),
            GenEvent::ThoughtLine(text) => ("thoughtln", text.clone()),
            GenEvent::Json(doc) => ("json", doc.to_string()),
            GenEvent::Error(msg) => ("thoughtln", format!("ERROR: {msg}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_classification() {
        assert!(!GenEvent::Thought("x".into()).is_terminal());
        assert!(!GenEvent::ThoughtLine("x".into()).is_terminal());
        assert!(GenEvent::Json(json!({})).is_terminal());
        assert!(GenEvent::Error("x".into()).is_terminal());
    }

    #[test]
    fn errors_ride_on_thoughtln() {
        let (name, payload) = GenEvent::Error("model unavailable".into()).wire_parts();
        assert_eq!(name, "thoughtln");
        assert_eq!(payload, "ERROR: model unavailable");
    }

    #[test]
    fn json_payload_is_serialized_document() {
        let (name, payload) = GenEvent::Json(json!({ "caption": "hi" })).wire_parts();
        assert_eq!(name, "json");
        assert_eq!(payload, r#"{"caption":"hi"}"#);
    }
}
