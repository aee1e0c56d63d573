//! LoRa Chat Runtime
//!
//! Execution side of a chat session:
//! - `SessionWorker`: the single task that owns the transport, the delivery
//!   tracker and the inbound router
//! - `SerialTransport`: the LoRa modem over a serial port
//! - `SessionBuilder`: wires a transport, the worker and a
//!   `PresentationBridge` together
//!
//! Protocol types and the presentation API live in `lorachat-core`.

pub mod builder;
pub mod port;
pub mod serial;
pub mod worker;

pub use builder::{SessionBuilder, SessionTask};
pub use port::{pick_port, resolve_port};
pub use serial::{SerialConfig, SerialTransport};
pub use worker::SessionWorker;

// Re-export core types for convenience
pub use lorachat_core::{
    AppEvent, ChannelConfig, Command, LoraChatError, PresentationBridge, Presenter,
    ProtocolConfig, Result, Transport, TransportError, Username,
};
