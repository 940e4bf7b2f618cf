use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification tag attached to each transcript entry, used for styling
/// and filtering by the rendering side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    System,
    Sent,
    Received,
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::System => "system",
            MessageKind::Sent => "sent",
            MessageKind::Received => "received",
            MessageKind::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript line. Immutable once constructed; a message has no
/// identity beyond its position in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(text, MessageKind::System)
    }

    pub fn sent(text: impl Into<String>) -> Self {
        Self::new(text, MessageKind::Sent)
    }

    pub fn received(text: impl Into<String>) -> Self {
        Self::new(text, MessageKind::Received)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, MessageKind::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}
