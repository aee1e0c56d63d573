//! Error types for the LoRa chat protocol
//!
//! Each concern gets its own enum so callers can decide what to surface:
//! decode failures are dropped, transport failures only affect one send,
//! validation failures are rejected before anything reaches the codec.
//! `LoraChatError` unifies them for code that just propagates.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Why an inbound frame could not be turned into a wire message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("Malformed JSON: {reason}")]
    MalformedJson { reason: String },
    #[error("Frame is not a JSON object")]
    NotAnObject,
    #[error("Missing `type` discriminator")]
    MissingType,
    #[error("Unknown message type: {message_type}")]
    UnknownType { message_type: String },
    #[error("Invalid {kind} message: {reason}")]
    InvalidFields { kind: &'static str, reason: String },
}

/// Why an outbound message could not be serialized
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Timestamp is not a finite number")]
    NonFiniteTimestamp,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Link-level failures; fatal to a single send attempt only
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No serial ports found")]
    NoPortFound,
    #[error("Failed to open serial port {port}: {reason}")]
    OpenFailed { port: String, reason: String },
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Link closed")]
    LinkClosed,
    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },
    #[error("Transport shutdown: {reason}")]
    Shutdown { reason: String },
}

/// Input rejected at the session boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username must be between {min} and {max} characters (got {len})")]
    UsernameLength { len: usize, min: usize, max: usize },
    #[error("Message content is empty")]
    EmptyContent,
    #[error("Message content is {len} bytes (max {max})")]
    ContentTooLong { len: usize, max: usize },
    #[error("Message content contains the modem frame marker {marker}")]
    FrameMarker { marker: &'static str },
}

/// Failures moving messages across the concurrency bridge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel buffer is full")]
    ChannelFull,
    #[error("Channel is closed")]
    ChannelClosed,
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Unified error type for the LoRa chat core
#[derive(Debug, thiserror::Error)]
pub enum LoraChatError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

pub type Result<T> = std::result::Result<T, LoraChatError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
