//! Property-based tests for the codec and delivery tracker
//!
//! These check the invariants the rest of the session relies on: lossless
//! round trips, tolerance of arbitrary input, and monotonic status.

use lorachat_core::{
    AckMessage, AckOutcome, ChatMessage, DeliveryStatus, DeliveryTracker, FixedTimeSource,
    MessageId, Timestamp, WireCodec, WireMessage,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn arb_id() -> impl Strategy<Value = MessageId> {
    "\\PC{1,32}".prop_map(MessageId::new)
}

fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    prop_oneof![
        (0.0f64..4_102_444_800.0),
        any::<i32>().prop_map(f64::from),
        any::<f64>().prop_filter("finite", |t| t.is_finite()),
    ]
    .prop_map(Timestamp::from_secs_f64)
}

fn arb_wire_message() -> impl Strategy<Value = WireMessage> {
    prop_oneof![
        (arb_id(), any::<String>(), any::<String>(), arb_timestamp()).prop_map(
            |(id, username, content, timestamp)| {
                WireMessage::Chat(ChatMessage::new(id, username, content, timestamp))
            }
        ),
        (arb_id(), any::<String>(), arb_timestamp()).prop_map(|(ack_id, username, timestamp)| {
            WireMessage::Ack(AckMessage {
                ack_id,
                username,
                timestamp,
            })
        }),
    ]
}

#[derive(Debug, Clone)]
enum TrackerOp {
    Sent(u8),
    Ack(u8),
}

fn arb_ops() -> impl Strategy<Value = Vec<TrackerOp>> {
    prop::collection::vec(
        prop_oneof![
            (0u8..8).prop_map(TrackerOp::Sent),
            (0u8..12).prop_map(TrackerOp::Ack),
        ],
        0..64,
    )
}

fn clock() -> FixedTimeSource {
    FixedTimeSource(Timestamp::from_secs_f64(1_700_000_000.0))
}

proptest! {
    /// Property: decode(encode(m)) == m for every message with a finite timestamp
    #[test]
    fn codec_round_trip(message in arb_wire_message()) {
        let bytes = WireCodec::encode(&message).expect("finite timestamps always encode");
        let decoded = WireCodec::decode(&bytes).expect("encoded output always decodes");
        prop_assert_eq!(decoded, message);
    }

    /// Property: encoded output never contains a raw line break
    #[test]
    fn encoded_output_is_single_line(message in arb_wire_message()) {
        let bytes = WireCodec::encode(&message).unwrap();
        prop_assert!(!bytes.contains(&b'\n'));
        prop_assert!(!bytes.contains(&b'\r'));
    }

    /// Property: arbitrary bytes never panic the decoder
    #[test]
    fn decode_tolerates_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = WireCodec::decode(&bytes);
    }

    /// Property: arbitrary JSON objects with an unknown type are rejected
    #[test]
    fn unknown_types_are_rejected(kind in "[a-z]{1,10}") {
        prop_assume!(kind != "chat" && kind != "ack");
        let raw = format!(r#"{{"type":"{}"}}"#, kind);
        prop_assert!(WireCodec::decode(raw.as_bytes()).is_err());
    }

    /// Property: status never moves backwards except by re-recording the same id
    #[test]
    fn status_is_monotonic(ops in arb_ops()) {
        let mut tracker = DeliveryTracker::new(clock());
        let mut model: HashMap<u8, DeliveryStatus> = HashMap::new();

        for op in ops {
            match op {
                TrackerOp::Sent(n) => {
                    tracker.record_sent(MessageId::new(n.to_string()));
                    model.insert(n, DeliveryStatus::Sent);
                }
                TrackerOp::Ack(n) => {
                    let id = MessageId::new(n.to_string());
                    let before = tracker.status_of(&id);
                    let outcome = tracker.apply_ack(&id, "peer");
                    let after = tracker.status_of(&id);

                    match before {
                        None => {
                            prop_assert_eq!(outcome, AckOutcome::Unknown);
                            prop_assert_eq!(after, None);
                        }
                        Some(status) => {
                            prop_assert!(after >= Some(status));
                            prop_assert_eq!(after, Some(DeliveryStatus::Acknowledged));
                            model.insert(n, DeliveryStatus::Acknowledged);
                        }
                    }
                }
            }
        }

        for (n, status) in model {
            prop_assert_eq!(tracker.status_of(&MessageId::new(n.to_string())), Some(status));
        }
    }

    /// Property: applying the same ack twice equals applying it once
    #[test]
    fn ack_is_idempotent(ids in prop::collection::vec(0u8..16, 1..16), target in 0u8..16) {
        let mut once = DeliveryTracker::new(clock());
        let mut twice = DeliveryTracker::new(clock());
        for n in &ids {
            once.record_sent(MessageId::new(n.to_string()));
            twice.record_sent(MessageId::new(n.to_string()));
        }

        let id = MessageId::new(target.to_string());
        once.apply_ack(&id, "peer");
        twice.apply_ack(&id, "peer");
        let second = twice.apply_ack(&id, "peer");

        prop_assert_ne!(second, AckOutcome::Acknowledged);
        prop_assert_eq!(once.stats(), twice.stats());
        prop_assert_eq!(once.get_record(&id), twice.get_record(&id));
    }

    /// Property: generated ids have the requested length and are hex
    #[test]
    fn generated_ids_are_hex(length in 4usize..=32) {
        let id = MessageId::generate(length);
        prop_assert_eq!(id.as_str().len(), length);
        prop_assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
