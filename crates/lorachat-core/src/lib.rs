//! LoRa Chat Core
//!
//! Message protocol and delivery-status engine for short text chat over a
//! half-duplex LoRa link: the wire codec, modem line framing, the delivery
//! tracker, the inbound router, and the channel types that bridge the
//! session worker to a single-threaded presentation context.
//!
//! The link gives no delivery guarantee. Status is informational only:
//! messages are `Sent` until a peer's read receipt moves them to
//! `Acknowledged`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod bridge;
pub mod channel;
pub mod codec;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod framing;
pub mod message;
pub mod router;
pub mod transport;
pub mod types;
pub mod validation;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use bridge::{dispatch, PresentationBridge, Presenter};
pub use channel::{AppEvent, Command, LinkStatus, Notice, NoticeLevel, SessionStats};
pub use codec::WireCodec;
pub use config::{ChannelConfig, ProtocolConfig};
pub use delivery::{AckOutcome, DeliveryRecord, DeliveryStats, DeliveryStatus, DeliveryTracker};
pub use errors::{
    ChannelError, DecodeError, EncodeError, LoraChatError, Result, TransportError,
    ValidationError,
};
pub use framing::{LineAssembler, SerialLine, TxReport};
pub use message::{AckMessage, ChatMessage, WireMessage};
pub use router::{InboundRouter, RouteAction};
pub use transport::{MemoryTransport, Transport, TransportEvent};
pub use types::{FixedTimeSource, MessageId, SystemTimeSource, TimeSource, Timestamp};
pub use validation::Username;
