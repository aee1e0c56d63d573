//! Delivery status tracking for outgoing messages
//!
//! The radio gives no delivery guarantee, so status is informational only:
//! a record starts in `Sent` and moves to `Acknowledged` when a read receipt
//! arrives. There are no retries, no timeouts and no failed state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::types::{MessageId, TimeSource, Timestamp};

// ----------------------------------------------------------------------------
// Delivery Status
// ----------------------------------------------------------------------------

/// Status of an outgoing message; ordered so that transitions only go up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Transmitted (or handed to the transport), no receipt yet
    Sent,
    /// A peer sent a read receipt for this message
    Acknowledged,
}

impl DeliveryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Acknowledged => "read",
        }
    }
}

// ----------------------------------------------------------------------------
// Delivery Record
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub message_id: MessageId,
    pub status: DeliveryStatus,
    pub created_at: Timestamp,
    pub acknowledged_at: Option<Timestamp>,
    /// Username of the first peer that acknowledged
    pub acknowledged_by: Option<String>,
    /// Insertion order, used for eviction
    sequence: u64,
}

impl DeliveryRecord {
    fn new(message_id: MessageId, created_at: Timestamp, sequence: u64) -> Self {
        Self {
            message_id,
            status: DeliveryStatus::Sent,
            created_at,
            acknowledged_at: None,
            acknowledged_by: None,
            sequence,
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.status == DeliveryStatus::Acknowledged
    }
}

/// Result of applying an inbound acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Record moved from `Sent` to `Acknowledged`
    Acknowledged,
    /// Record was already acknowledged; nothing changed
    AlreadyAcknowledged,
    /// No record for this id; nothing changed
    Unknown,
}

// ----------------------------------------------------------------------------
// Delivery Tracker
// ----------------------------------------------------------------------------

/// Default number of records kept before the oldest are evicted
pub const DEFAULT_MAX_TRACKED: usize = 1024;

/// Per-message delivery status, keyed by message id
#[derive(Debug)]
pub struct DeliveryTracker<T: TimeSource> {
    records: HashMap<MessageId, DeliveryRecord>,
    time_source: T,
    max_tracked: usize,
    next_sequence: u64,
}

impl<T: TimeSource> DeliveryTracker<T> {
    pub fn new(time_source: T) -> Self {
        Self::with_capacity(DEFAULT_MAX_TRACKED, time_source)
    }

    /// Create a tracker that keeps at most `max_tracked` records
    pub fn with_capacity(max_tracked: usize, time_source: T) -> Self {
        Self {
            records: HashMap::new(),
            time_source,
            max_tracked: max_tracked.max(1),
            next_sequence: 0,
        }
    }

    /// Start tracking an outgoing message in `Sent`
    ///
    /// An existing record with the same id is replaced.
    pub fn record_sent(&mut self, message_id: MessageId) {
        let record = DeliveryRecord::new(
            message_id.clone(),
            self.time_source.now(),
            self.next_sequence,
        );
        self.next_sequence += 1;

        if self.records.insert(message_id.clone(), record).is_some() {
            debug!("Replaced delivery record for colliding id {}", message_id);
        }

        let evicted = self.cleanup_by_count(self.max_tracked);
        if evicted > 0 {
            debug!("Evicted {} oldest delivery records", evicted);
        }
    }

    /// Apply a read receipt for `message_id` sent by `acknowledged_by`
    ///
    /// Unknown ids and repeated receipts leave the tracker unchanged.
    pub fn apply_ack(&mut self, message_id: &MessageId, acknowledged_by: &str) -> AckOutcome {
        let Some(record) = self.records.get_mut(message_id) else {
            trace!("Ack for unknown message {}", message_id);
            return AckOutcome::Unknown;
        };

        if record.is_acknowledged() {
            return AckOutcome::AlreadyAcknowledged;
        }

        record.status = DeliveryStatus::Acknowledged;
        record.acknowledged_at = Some(self.time_source.now());
        record.acknowledged_by = Some(acknowledged_by.to_string());
        AckOutcome::Acknowledged
    }

    /// Current status, or `None` if the id was never recorded (or evicted)
    pub fn status_of(&self, message_id: &MessageId) -> Option<DeliveryStatus> {
        self.records.get(message_id).map(|record| record.status)
    }

    pub fn get_record(&self, message_id: &MessageId) -> Option<&DeliveryRecord> {
        self.records.get(message_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove the oldest records until at most `max_count` remain
    pub fn cleanup_by_count(&mut self, max_count: usize) -> usize {
        if self.records.len() <= max_count {
            return 0;
        }

        let mut by_age: Vec<(u64, MessageId)> = self
            .records
            .values()
            .map(|record| (record.sequence, record.message_id.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(sequence, _)| *sequence);

        let to_remove = self.records.len() - max_count;
        for (_, id) in by_age.into_iter().take(to_remove) {
            self.records.remove(&id);
        }
        to_remove
    }

    pub fn stats(&self) -> DeliveryStats {
        let mut stats = DeliveryStats::default();
        for record in self.records.values() {
            stats.total += 1;
            match record.status {
                DeliveryStatus::Sent => stats.sent += 1,
                DeliveryStatus::Acknowledged => stats.acknowledged += 1,
            }
        }
        stats
    }
}

// ----------------------------------------------------------------------------
// Delivery Statistics
// ----------------------------------------------------------------------------

/// Counts of tracked messages by status
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub total: u32,
    pub sent: u32,
    pub acknowledged: u32,
}

impl DeliveryStats {
    /// Fraction of tracked messages that were read (0.0 to 1.0)
    pub fn read_rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.acknowledged as f32 / self.total as f32
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
