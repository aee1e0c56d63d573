//! Core types for the LoRa chat protocol
//!
//! Newtypes for the values that travel on the wire, plus the time source
//! abstraction used by the tracker and router.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Message Identifier
// ----------------------------------------------------------------------------

/// Shortest identifier `MessageId::generate` will produce
pub const MIN_ID_LENGTH: usize = 4;

/// Longest identifier `MessageId::generate` will produce (a full simple UUID)
pub const MAX_ID_LENGTH: usize = 32;

/// Opaque identifier of a chat message, chosen by the sender
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an existing identifier (e.g. one received from a peer)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier of `length` lowercase hex characters
    ///
    /// Characters come from a random v4 UUID, so 8 characters carry 32 bits
    /// of entropy. `length` is clamped to `MIN_ID_LENGTH..=MAX_ID_LENGTH`.
    pub fn generate(length: usize) -> Self {
        let length = length.clamp(MIN_ID_LENGTH, MAX_ID_LENGTH);
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(length);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Wall-clock time as floating point seconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    /// Current system time
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0);
        Self(secs)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Time Source Trait
// ----------------------------------------------------------------------------

/// Provides timestamps to the tracker, router and bridge
///
/// Tests inject a fixed or stepping clock; production code uses
/// `SystemTimeSource`.
pub trait TimeSource {
    /// Get the current timestamp
    fn now(&self) -> Timestamp;
}

/// Standard library implementation of TimeSource
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub Timestamp);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        self.0
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_id_length_and_alphabet() {
        let id = MessageId::generate(8);
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(MessageId::generate(0).as_str().len(), MIN_ID_LENGTH);
        assert_eq!(MessageId::generate(100).as_str().len(), MAX_ID_LENGTH);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: HashSet<MessageId> = (0..1000).map(|_| MessageId::generate(12)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_timestamp_serializes_as_number() {
        let json = serde_json::to_string(&Timestamp::from_secs_f64(1000.5)).unwrap();
        assert_eq!(json, "1000.5");

        let id = serde_json::to_string(&MessageId::from("m1")).unwrap();
        assert_eq!(id, "\"m1\"");
    }
}
