//! JSON wire codec
//!
//! One record per call: framing is handled by the transport, so `decode`
//! always receives exactly the bytes of a single message.
//!
//! ```text
//! {"type":"chat","id":<string>,"username":<string>,"content":<string>,"timestamp":<number>}
//! {"type":"ack","ack_id":<string>,"username":<string>,"timestamp":<number>}
//! ```

use serde_json::Value;

use crate::errors::{DecodeError, EncodeError};
use crate::message::{AckMessage, ChatMessage, WireMessage};

/// Field carrying the message kind
pub const TYPE_FIELD: &str = "type";

// ----------------------------------------------------------------------------
// Wire Codec
// ----------------------------------------------------------------------------

/// Encoder/decoder for the two wire message kinds
pub struct WireCodec;

impl WireCodec {
    /// Encode a message to compact JSON bytes
    ///
    /// Field order is fixed by the type definitions, so equal messages
    /// always produce identical bytes.
    pub fn encode(message: &WireMessage) -> Result<Vec<u8>, EncodeError> {
        if !message.timestamp().is_finite() {
            return Err(EncodeError::NonFiniteTimestamp);
        }
        Ok(serde_json::to_vec(message)?)
    }

    /// Decode one record
    ///
    /// The discriminator is inspected before the fields so an unknown kind is
    /// reported as such rather than as a generic parse failure.
    pub fn decode(bytes: &[u8]) -> Result<WireMessage, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::MalformedJson {
                reason: e.to_string(),
            })?;

        let kind = match &value {
            Value::Object(fields) => match fields.get(TYPE_FIELD) {
                Some(Value::String(kind)) => kind.clone(),
                Some(other) => {
                    return Err(DecodeError::UnknownType {
                        message_type: other.to_string(),
                    })
                }
                None => return Err(DecodeError::MissingType),
            },
            _ => return Err(DecodeError::NotAnObject),
        };

        match kind.as_str() {
            "chat" => {
                let chat: ChatMessage =
                    serde_json::from_value(value).map_err(|e| invalid_fields("chat", e))?;
                if chat.id.is_empty() {
                    return Err(DecodeError::InvalidFields {
                        kind: "chat",
                        reason: "empty id".to_string(),
                    });
                }
                Ok(WireMessage::Chat(chat))
            }
            "ack" => {
                let ack: AckMessage =
                    serde_json::from_value(value).map_err(|e| invalid_fields("ack", e))?;
                if ack.ack_id.is_empty() {
                    return Err(DecodeError::InvalidFields {
                        kind: "ack",
                        reason: "empty ack_id".to_string(),
                    });
                }
                Ok(WireMessage::Ack(ack))
            }
            _ => Err(DecodeError::UnknownType { message_type: kind }),
        }
    }
}

fn invalid_fields(kind: &'static str, err: serde_json::Error) -> DecodeError {
    DecodeError::InvalidFields {
        kind,
        reason: err.to_string(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageId, Timestamp};

    fn chat() -> WireMessage {
        WireMessage::Chat(ChatMessage::new(
            MessageId::from("m1"),
            "alice",
            "hi",
            Timestamp::from_secs_f64(1000.0),
        ))
    }

    #[test]
    fn test_chat_wire_layout() {
        let bytes = WireCodec::encode(&chat()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"chat","id":"m1","username":"alice","content":"hi","timestamp":1000.0}"#
        );
    }

    #[test]
    fn test_ack_wire_layout() {
        let ack = WireMessage::Ack(AckMessage {
            ack_id: MessageId::from("m1"),
            username: "bob".to_string(),
            timestamp: Timestamp::from_secs_f64(1001.25),
        });
        let bytes = WireCodec::encode(&ack).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"ack","ack_id":"m1","username":"bob","timestamp":1001.25}"#
        );
    }

    #[test]
    fn test_decode_accepts_integer_timestamp_and_extra_fields() {
        let raw = br#"{"type":"ack","ack_id":"m1","username":"bob","timestamp":1001,"rssi":-80}"#;
        match WireCodec::decode(raw).unwrap() {
            WireMessage::Ack(ack) => {
                assert_eq!(ack.ack_id.as_str(), "m1");
                assert_eq!(ack.timestamp.as_secs_f64(), 1001.0);
            }
            other => panic!("expected ack, got {:?}", other),
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(
            WireCodec::encode(&chat()).unwrap(),
            WireCodec::encode(&chat()).unwrap()
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert_eq!(
            WireCodec::decode(br#"{"type":"ping"}"#),
            Err(DecodeError::UnknownType {
                message_type: "ping".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(WireCodec::decode(&[0xff, 0xfe]), Err(DecodeError::InvalidUtf8));
        assert!(matches!(
            WireCodec::decode(b"{\"type\":"),
            Err(DecodeError::MalformedJson { .. })
        ));
        assert_eq!(WireCodec::decode(b"[1,2]"), Err(DecodeError::NotAnObject));
        assert_eq!(
            WireCodec::decode(br#"{"id":"m1"}"#),
            Err(DecodeError::MissingType)
        );
        assert!(matches!(
            WireCodec::decode(br#"{"type":7}"#),
            Err(DecodeError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_missing_or_empty_fields() {
        assert!(matches!(
            WireCodec::decode(br#"{"type":"chat","id":"m1","username":"a","timestamp":1}"#),
            Err(DecodeError::InvalidFields { kind: "chat", .. })
        ));
        assert!(matches!(
            WireCodec::decode(br#"{"type":"ack","ack_id":"","username":"a","timestamp":1}"#),
            Err(DecodeError::InvalidFields { kind: "ack", .. })
        ));
        assert!(matches!(
            WireCodec::decode(
                br#"{"type":"chat","id":"m1","username":"a","content":"x","timestamp":"now"}"#
            ),
            Err(DecodeError::InvalidFields { .. })
        ));
    }

    #[test]
    fn test_non_finite_timestamp_is_not_encoded() {
        let message = WireMessage::Chat(ChatMessage::new(
            MessageId::from("m1"),
            "alice",
            "hi",
            Timestamp::from_secs_f64(f64::NAN),
        ));
        assert!(matches!(
            WireCodec::encode(&message),
            Err(EncodeError::NonFiniteTimestamp)
        ));
    }
}
