//! Session Configuration
//!
//! Protocol limits and CSP channel buffer sizes. Both structs deserialize
//! with defaults for missing fields so partial TOML files work.

use serde::{Deserialize, Serialize};

use crate::errors::{LoraChatError, Result};
use crate::types::{MAX_ID_LENGTH, MIN_ID_LENGTH};

// ----------------------------------------------------------------------------
// Protocol Configuration
// ----------------------------------------------------------------------------

/// Limits and behaviour switches for the message protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Maximum UTF-8 length of chat content, in bytes
    pub max_content_bytes: usize,
    /// Length of generated message identifiers
    pub id_length: usize,
    /// Delivery records kept before the oldest are evicted
    pub max_tracked_messages: usize,
    /// Ignore inbound chats carrying our own username (radio echo)
    pub ignore_own_echo: bool,
    /// Inbound message ids remembered for duplicate suppression
    pub dedup_capacity: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: 180, // Leaves room for the JSON envelope in a LoRa payload
            id_length: 8,
            max_tracked_messages: 1024,
            ignore_own_echo: true,
            dedup_capacity: 256,
        }
    }
}

impl ProtocolConfig {
    /// Small limits so eviction paths are easy to exercise
    pub fn testing() -> Self {
        Self {
            max_content_bytes: 64,
            id_length: 8,
            max_tracked_messages: 16,
            ignore_own_echo: true,
            dedup_capacity: 16,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_content_bytes == 0 {
            return Err(configuration("Max content bytes cannot be zero"));
        }
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&self.id_length) {
            return Err(LoraChatError::Configuration {
                reason: format!(
                    "Id length must be between {} and {} (got {})",
                    MIN_ID_LENGTH, MAX_ID_LENGTH, self.id_length
                ),
            });
        }
        if self.max_tracked_messages == 0 {
            return Err(configuration("Max tracked messages cannot be zero"));
        }
        if self.dedup_capacity == 0 {
            return Err(configuration("Dedup capacity cannot be zero"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Configuration for CSP channel buffer sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Buffer size for Command channels (presentation → worker)
    pub command_buffer_size: usize,
    /// Buffer size for AppEvent channels (worker → presentation)
    pub app_event_buffer_size: usize,
    /// Buffer size for inbound transport events (reader → worker)
    pub inbound_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,   // Typing is slow compared to the radio
            app_event_buffer_size: 64, // Status updates arrive in bursts after a send
            inbound_buffer_size: 64,
        }
    }
}

impl ChannelConfig {
    /// Tiny buffers so backpressure shows up in tests
    pub fn testing() -> Self {
        Self {
            command_buffer_size: 4,
            app_event_buffer_size: 8,
            inbound_buffer_size: 8,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.command_buffer_size == 0 {
            return Err(configuration("Command buffer size cannot be zero"));
        }
        if self.app_event_buffer_size == 0 {
            return Err(configuration("App event buffer size cannot be zero"));
        }
        if self.inbound_buffer_size == 0 {
            return Err(configuration("Inbound buffer size cannot be zero"));
        }
        Ok(())
    }
}

fn configuration(reason: &str) -> LoraChatError {
    LoraChatError::Configuration {
        reason: reason.to_string(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
