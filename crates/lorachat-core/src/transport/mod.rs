//! Transport Trait Definition
//!
//! A transport owns the physical link and moves opaque payloads: one call to
//! `send` puts one record on the wire, one `TransportEvent::Frame` carries
//! one received record. It knows nothing about message semantics.
//!
//! Implementations:
//! - `MemoryTransport` (here): an in-process pair for tests and demos
//! - `SerialTransport` in `lorachat-runtime`: the LoRa modem over a serial port

pub mod memory;

pub use memory::{LinkControl, MemoryTransport};

use crate::errors::TransportError;
use crate::framing::TxReport;

/// Something the transport observed on the link
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One received record, exactly as handed to the codec
    Frame(Vec<u8>),
    /// The modem finished transmitting a frame
    TxDone(TxReport),
}

#[async_trait::async_trait]
pub trait Transport: Send {
    /// Transmit one payload as a whole frame
    ///
    /// Either the complete frame is written or an error is returned; a
    /// failure affects this payload only.
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Wait for the next event; `Ok(None)` once the link is closed
    ///
    /// Must be cancel safe: the worker polls it inside `tokio::select!`.
    async fn receive(&mut self) -> Result<Option<TransportEvent>, TransportError>;

    /// Release the link; further sends fail with `LinkClosed`
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Human-readable link name for status displays
    fn name(&self) -> &str;
}
