//! Classification and formatting of frame payloads into transcript messages.

use serde_json::Value;

use crate::types::{Message, MessageKind};

/// Outcome of decoding an inbound frame. A payload is `Structured` only
/// when it parses as JSON and the parsed value is a composite; primitives
/// and unparseable text stay `Opaque` and render verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    Structured(Value),
    Opaque(String),
}

pub fn classify(raw: &str) -> InboundPayload {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() || value.is_array() => InboundPayload::Structured(value),
        _ => InboundPayload::Opaque(raw.to_string()),
    }
}

/// Turns an inbound frame into its transcript entry. Decode failure is a
/// fallback to the raw text, never an error entry.
pub fn receive(raw: &str) -> Message {
    let text = match classify(raw) {
        InboundPayload::Structured(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string())
        }
        InboundPayload::Opaque(text) => text,
    };
    Message::new(text, MessageKind::Received)
}

/// Turns an outbound frame into its transcript entry, text unmodified.
/// The connected/non-empty guard belongs to the caller.
pub fn send(text: &str) -> Message {
    Message::new(text, MessageKind::Sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_payload_renders_pretty_with_two_space_indent() {
        let message = receive(r#"{"a":1}"#);
        assert_eq!(message.kind, MessageKind::Received);
        assert_eq!(message.text, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn object_payload_keeps_input_key_order() {
        let message = receive(r#"{"b":1,"a":2}"#);
        assert_eq!(message.text, "{\n  \"b\": 1,\n  \"a\": 2\n}");
    }

    #[test]
    fn array_payload_is_structured() {
        assert!(matches!(
            classify(r#"[1,2]"#),
            InboundPayload::Structured(_)
        ));
        let message = receive(r#"[1,2]"#);
        assert_eq!(message.text, "[\n  1,\n  2\n]");
    }

    #[test]
    fn primitive_payloads_render_verbatim() {
        assert_eq!(receive("42").text, "42");
        assert_eq!(receive("\"hi\"").text, "\"hi\"");
        assert_eq!(receive("null").text, "null");
        assert_eq!(receive("true").text, "true");
    }

    #[test]
    fn malformed_payload_falls_back_to_raw_text() {
        let message = receive("plain text");
        assert_eq!(message.kind, MessageKind::Received);
        assert_eq!(message.text, "plain text");

        let message = receive(r#"{"broken":"#);
        assert_eq!(message.kind, MessageKind::Received);
        assert_eq!(message.text, r#"{"broken":"#);
    }

    #[test]
    fn classify_separates_composites_from_opaque_text() {
        assert!(matches!(
            classify(r#"{"a":1}"#),
            InboundPayload::Structured(_)
        ));
        assert_eq!(
            classify("17"),
            InboundPayload::Opaque("17".to_string())
        );
        assert_eq!(
            classify("not json"),
            InboundPayload::Opaque("not json".to_string())
        );
    }

    #[test]
    fn send_keeps_text_unmodified() {
        let message = send("  padded  ");
        assert_eq!(message.kind, MessageKind::Sent);
        assert_eq!(message.text, "  padded  ");
    }
}
