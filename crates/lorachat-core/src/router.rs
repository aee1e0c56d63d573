//! Inbound message routing
//!
//! Classifies each decoded frame and decides what the session does with it.
//! The router only mutates the delivery tracker; emitting events and sending
//! acks is left to the caller so the router stays free of I/O.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace};

use crate::codec::WireCodec;
use crate::delivery::{AckOutcome, DeliveryTracker};
use crate::errors::DecodeError;
use crate::message::{AckMessage, ChatMessage, WireMessage};
use crate::types::{MessageId, TimeSource};

// ----------------------------------------------------------------------------
// Route Actions
// ----------------------------------------------------------------------------

/// What the session should do with one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum RouteAction {
    /// Show the chat, then transmit the prepared read receipt
    Display {
        message: ChatMessage,
        ack: AckMessage,
    },
    /// An outgoing message just moved to `Acknowledged`
    Acknowledged {
        message_id: MessageId,
        acknowledged_by: String,
    },
    AlreadyAcknowledged { message_id: MessageId },
    /// Ack for an id we never sent (or already evicted)
    UnknownAck { message_id: MessageId },
    /// Our own transmission heard back over the air
    IgnoredEcho { message_id: MessageId },
    /// Chat already displayed and acked in this session
    IgnoredDuplicate { message_id: MessageId },
}

impl RouteAction {
    /// Whether the presentation layer needs to hear about this action
    pub fn is_visible(&self) -> bool {
        matches!(
            self,
            RouteAction::Display { .. } | RouteAction::Acknowledged { .. }
        )
    }
}

// ----------------------------------------------------------------------------
// Recent Id Window
// ----------------------------------------------------------------------------

/// Sender and id of a chat; short ids from different peers may collide
type SeenKey = (String, MessageId);

/// Bounded set of recently seen chats, oldest evicted first
#[derive(Debug)]
pub struct RecentIds {
    set: HashSet<SeenKey>,
    order: VecDeque<SeenKey>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            set: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Remember `id` from `sender`; returns false if it was already present
    pub fn insert(&mut self, sender: &str, id: &MessageId) -> bool {
        let key = (sender.to_string(), id.clone());
        if self.set.contains(&key) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(key.clone());
        self.order.push_back(key);
        true
    }

    pub fn contains(&self, sender: &str, id: &MessageId) -> bool {
        self.set.contains(&(sender.to_string(), id.clone()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Inbound Router
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub struct InboundRouter<T: TimeSource> {
    local_username: String,
    ignore_own_echo: bool,
    seen: RecentIds,
    time_source: T,
}

impl<T: TimeSource> InboundRouter<T> {
    pub fn new(
        local_username: impl Into<String>,
        ignore_own_echo: bool,
        dedup_capacity: usize,
        time_source: T,
    ) -> Self {
        Self {
            local_username: local_username.into(),
            ignore_own_echo,
            seen: RecentIds::new(dedup_capacity),
            time_source,
        }
    }

    pub fn local_username(&self) -> &str {
        &self.local_username
    }

    /// Route one decoded message
    ///
    /// Each call is applied to the tracker as a single step; no state is
    /// carried between frames except the duplicate window.
    pub fn route<U: TimeSource>(
        &mut self,
        message: WireMessage,
        tracker: &mut DeliveryTracker<U>,
    ) -> RouteAction {
        match message {
            WireMessage::Chat(chat) => self.route_chat(chat),
            WireMessage::Ack(ack) => {
                let message_id = ack.ack_id;
                match tracker.apply_ack(&message_id, &ack.username) {
                    AckOutcome::Acknowledged => {
                        debug!("Message {} read by {}", message_id, ack.username);
                        RouteAction::Acknowledged {
                            message_id,
                            acknowledged_by: ack.username,
                        }
                    }
                    AckOutcome::AlreadyAcknowledged => {
                        RouteAction::AlreadyAcknowledged { message_id }
                    }
                    AckOutcome::Unknown => RouteAction::UnknownAck { message_id },
                }
            }
        }
    }

    /// Decode then route a raw frame payload
    pub fn route_frame<U: TimeSource>(
        &mut self,
        payload: &[u8],
        tracker: &mut DeliveryTracker<U>,
    ) -> Result<RouteAction, DecodeError> {
        let message = WireCodec::decode(payload)?;
        Ok(self.route(message, tracker))
    }

    fn route_chat(&mut self, chat: ChatMessage) -> RouteAction {
        if self.ignore_own_echo && chat.username == self.local_username {
            trace!("Ignoring own echo {}", chat.id);
            return RouteAction::IgnoredEcho {
                message_id: chat.id,
            };
        }

        if !self.seen.insert(&chat.username, &chat.id) {
            debug!("Ignoring duplicate chat {} from {}", chat.id, chat.username);
            return RouteAction::IgnoredDuplicate {
                message_id: chat.id,
            };
        }

        let ack = AckMessage::for_message(&chat, &self.local_username, self.time_source.now());
        RouteAction::Display { message: chat, ack }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryStatus;
    use crate::types::{FixedTimeSource, Timestamp};

    fn clock() -> FixedTimeSource {
        FixedTimeSource(Timestamp::from_secs_f64(2000.0))
    }

    fn router(name: &str) -> InboundRouter<FixedTimeSource> {
        InboundRouter::new(name, true, 8, clock())
    }

    fn chat(id: &str, from: &str) -> WireMessage {
        WireMessage::Chat(ChatMessage::new(
            MessageId::from(id),
            from,
            "hi",
            Timestamp::from_secs_f64(1000.0),
        ))
    }

    fn ack(id: &str, from: &str) -> WireMessage {
        WireMessage::Ack(AckMessage {
            ack_id: MessageId::from(id),
            username: from.to_string(),
            timestamp: Timestamp::from_secs_f64(1001.0),
        })
    }

    #[test]
    fn test_chat_is_displayed_with_ack() {
        let mut bob = router("bob");
        let mut tracker = DeliveryTracker::new(clock());

        match bob.route(chat("m1", "alice"), &mut tracker) {
            RouteAction::Display { message, ack } => {
                assert_eq!(message.id.as_str(), "m1");
                assert_eq!(ack.ack_id.as_str(), "m1");
                assert_eq!(ack.username, "bob");
                assert_eq!(ack.timestamp, Timestamp::from_secs_f64(2000.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_ack_updates_tracker() {
        let mut alice = router("alice");
        let mut tracker = DeliveryTracker::new(clock());
        tracker.record_sent(MessageId::from("m1"));

        let action = alice.route(ack("m1", "bob"), &mut tracker);
        assert_eq!(
            action,
            RouteAction::Acknowledged {
                message_id: MessageId::from("m1"),
                acknowledged_by: "bob".to_string()
            }
        );
        assert!(action.is_visible());
        assert_eq!(
            tracker.status_of(&MessageId::from("m1")),
            Some(DeliveryStatus::Acknowledged)
        );

        let again = alice.route(ack("m1", "bob"), &mut tracker);
        assert!(matches!(again, RouteAction::AlreadyAcknowledged { .. }));
        assert!(!again.is_visible());
    }

    #[test]
    fn test_unknown_ack() {
        let mut alice = router("alice");
        let mut tracker = DeliveryTracker::new(clock());
        let action = alice.route(ack("nope", "bob"), &mut tracker);
        assert!(matches!(action, RouteAction::UnknownAck { .. }));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_own_echo_is_ignored() {
        let mut alice = router("alice");
        let mut tracker = DeliveryTracker::new(clock());
        let action = alice.route(chat("m1", "alice"), &mut tracker);
        assert!(matches!(action, RouteAction::IgnoredEcho { .. }));

        let mut permissive = InboundRouter::new("alice", false, 8, clock());
        let action = permissive.route(chat("m1", "alice"), &mut tracker);
        assert!(matches!(action, RouteAction::Display { .. }));
    }

    #[test]
    fn test_duplicate_chat_is_acked_once() {
        let mut bob = router("bob");
        let mut tracker = DeliveryTracker::new(clock());
        assert!(matches!(
            bob.route(chat("m1", "alice"), &mut tracker),
            RouteAction::Display { .. }
        ));
        assert!(matches!(
            bob.route(chat("m1", "alice"), &mut tracker),
            RouteAction::IgnoredDuplicate { .. }
        ));
    }

    #[test]
    fn test_route_frame_reports_decode_errors() {
        let mut bob = router("bob");
        let mut tracker = DeliveryTracker::new(clock());
        let result = bob.route_frame(br#"{"type":"ping"}"#, &mut tracker);
        assert!(matches!(result, Err(DecodeError::UnknownType { .. })));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_same_id_from_different_senders_is_not_a_duplicate() {
        let mut carol = router("carol");
        let mut tracker = DeliveryTracker::new(clock());
        assert!(matches!(
            carol.route(chat("a1b2c3d4", "alice"), &mut tracker),
            RouteAction::Display { .. }
        ));
        match carol.route(chat("a1b2c3d4", "bob"), &mut tracker) {
            RouteAction::Display { message, ack } => {
                assert_eq!(message.username, "bob");
                assert_eq!(ack.ack_id.as_str(), "a1b2c3d4");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            carol.route(chat("a1b2c3d4", "bob"), &mut tracker),
            RouteAction::IgnoredDuplicate { .. }
        ));
    }

    #[test]
    fn test_recent_ids_window() {
        let mut window = RecentIds::new(2);
        assert!(window.insert("alice", &MessageId::from("a")));
        assert!(window.insert("alice", &MessageId::from("b")));
        assert!(!window.insert("alice", &MessageId::from("a")));
        assert!(window.insert("bob", &MessageId::from("a")));
        assert_eq!(window.len(), 2);
        assert!(!window.contains("alice", &MessageId::from("a")));
        assert!(window.contains("bob", &MessageId::from("a")));
        assert!(window.insert("alice", &MessageId::from("a")));
    }
}
