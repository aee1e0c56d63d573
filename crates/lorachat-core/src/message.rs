//! Wire message kinds
//!
//! Exactly two kinds travel over the radio. `WireMessage` is a closed sum
//! type, internally tagged by `type`, so the serialized field order matches
//! what existing modems and peers expect.

use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::errors::ValidationError;
use crate::types::{MessageId, Timestamp};
use crate::validation::{validate_content, Username};

// ----------------------------------------------------------------------------
// Chat Message
// ----------------------------------------------------------------------------

/// A user-authored text message; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub username: String,
    pub content: String,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        username: impl Into<String>,
        content: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Validate user input and build a message with a fresh id
    pub fn compose(
        username: &Username,
        content: &str,
        config: &ProtocolConfig,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let content = validate_content(content, config.max_content_bytes)?;
        Ok(Self::new(
            MessageId::generate(config.id_length),
            username.as_str(),
            content,
            now,
        ))
    }
}

// ----------------------------------------------------------------------------
// Ack Message
// ----------------------------------------------------------------------------

/// Read receipt for a chat message, referenced by id only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckMessage {
    pub ack_id: MessageId,
    pub username: String,
    pub timestamp: Timestamp,
}

impl AckMessage {
    /// Build the acknowledgement `acknowledger` sends for `message`
    pub fn for_message(message: &ChatMessage, acknowledger: &str, now: Timestamp) -> Self {
        Self {
            ack_id: message.id.clone(),
            username: acknowledger.to_string(),
            timestamp: now,
        }
    }
}

// ----------------------------------------------------------------------------
// Wire Message
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    Chat(ChatMessage),
    Ack(AckMessage),
}

impl WireMessage {
    /// Discriminator value as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Chat(_) => "chat",
            WireMessage::Ack(_) => "ack",
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            WireMessage::Chat(chat) => chat.timestamp,
            WireMessage::Ack(ack) => ack.timestamp,
        }
    }
}

impl From<ChatMessage> for WireMessage {
    fn from(message: ChatMessage) -> Self {
        WireMessage::Chat(message)
    }
}

impl From<AckMessage> for WireMessage {
    fn from(ack: AckMessage) -> Self {
        WireMessage::Ack(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_trims_and_assigns_id() {
        let alice = Username::parse("alice").unwrap();
        let config = ProtocolConfig::default();
        let now = Timestamp::from_secs_f64(1000.0);

        let message = ChatMessage::compose(&alice, "  hi bob ", &config, now).unwrap();
        assert_eq!(message.content, "hi bob");
        assert_eq!(message.username, "alice");
        assert_eq!(message.id.as_str().len(), config.id_length);
        assert_eq!(message.timestamp, now);
    }

    #[test]
    fn test_compose_rejects_oversized_content() {
        let alice = Username::parse("alice").unwrap();
        let config = ProtocolConfig {
            max_content_bytes: 4,
            ..ProtocolConfig::default()
        };
        let result = ChatMessage::compose(&alice, "hello", &config, Timestamp::now());
        assert_eq!(result, Err(ValidationError::ContentTooLong { len: 5, max: 4 }));
    }

    #[test]
    fn test_ack_references_message_id() {
        let message = ChatMessage::new(
            MessageId::from("m1"),
            "alice",
            "hi",
            Timestamp::from_secs_f64(1.0),
        );
        let ack = AckMessage::for_message(&message, "bob", Timestamp::from_secs_f64(2.0));
        assert_eq!(ack.ack_id, MessageId::from("m1"));
        assert_eq!(ack.username, "bob");
        assert_eq!(WireMessage::from(ack).kind(), "ack");
    }
}
