//! CSP Channel Communication Protocol Types
//!
//! Everything that crosses between the presentation context and the session
//! worker is one of these two enums.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryStats, DeliveryStatus};
use crate::message::ChatMessage;
use crate::types::MessageId;

// ----------------------------------------------------------------------------
// Command: Presentation → Session Worker
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Transmit an already validated chat message and start tracking it
    SendChat(ChatMessage),
    /// Ask for the current delivery status of one message
    QueryStatus { message_id: MessageId },
    /// Request session counters
    GetSessionStats,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SendChat(_) => "SendChat",
            Command::QueryStatus { .. } => "QueryStatus",
            Command::GetSessionStats => "GetSessionStats",
        }
    }
}

// ----------------------------------------------------------------------------
// AppEvent: Session Worker → Presentation
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// A peer's chat message, decoded and acknowledged
    ChatReceived(ChatMessage),
    /// One of our messages changed delivery status
    StatusChanged {
        message_id: MessageId,
        status: DeliveryStatus,
        acknowledged_by: Option<String>,
    },
    /// Reply to `Command::QueryStatus`; `None` means not tracked
    StatusReport {
        message_id: MessageId,
        status: Option<DeliveryStatus>,
    },
    /// Reply to `Command::GetSessionStats`
    SessionStats(SessionStats),
    LinkStatus(LinkStatus),
    /// Non-fatal problem worth showing in a status line
    Notice(Notice),
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Whether the transport is usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    Up { transport: String },
    Down { reason: String },
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Up { transport } => write!(f, "connected via {}", transport),
            LinkStatus::Down { reason } => write!(f, "disconnected: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Session counters reported by the worker
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub delivery: DeliveryStats,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub decode_errors: u64,
    pub send_errors: u64,
    pub acks_sent: u64,
    pub tx_reports: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(Command::GetSessionStats.name(), "GetSessionStats");
        let query = Command::QueryStatus {
            message_id: MessageId::from("m1"),
        };
        assert_eq!(query.name(), "QueryStatus");
    }

    #[test]
    fn test_link_status_display() {
        let up = LinkStatus::Up {
            transport: "/dev/ttyACM0".to_string(),
        };
        assert_eq!(up.to_string(), "connected via /dev/ttyACM0");
        assert_eq!(Notice::error("boom").level, NoticeLevel::Error);
    }
}
