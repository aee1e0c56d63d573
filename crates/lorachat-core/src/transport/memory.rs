//! In-memory transport pair
//!
//! Two connected endpoints over bounded tokio channels. Payloads are checked
//! with the same framing rules as the serial modem, so anything that passes
//! here would also frame correctly on the radio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::errors::TransportError;
use crate::framing::encode_frame;
use crate::transport::{Transport, TransportEvent};

/// Fault injection switches shared by both ends of a pair
#[derive(Debug, Default)]
pub struct LinkControl {
    drop_outbound: AtomicBool,
    fail_sends: AtomicBool,
}

impl LinkControl {
    /// Silently lose every frame from now on (the radio path is gone)
    pub fn set_drop_outbound(&self, drop: bool) {
        self.drop_outbound.store(drop, Ordering::SeqCst);
    }

    /// Make every send return an I/O error
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    fn dropping(&self) -> bool {
        self.drop_outbound.load(Ordering::SeqCst)
    }

    fn failing(&self) -> bool {
        self.fail_sends.load(Ordering::SeqCst)
    }
}

/// One end of an in-memory link
#[derive(Debug)]
pub struct MemoryTransport {
    name: String,
    outbound: Option<mpsc::Sender<Vec<u8>>>,
    inbound: mpsc::Receiver<Vec<u8>>,
    control: Arc<LinkControl>,
}

impl MemoryTransport {
    /// Create two connected endpoints, each buffering up to `capacity` frames
    pub fn pair(capacity: usize) -> (Self, Self) {
        let capacity = capacity.max(1);
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        let control = Arc::new(LinkControl::default());

        let a = Self {
            name: "memory-a".to_string(),
            outbound: Some(a_tx),
            inbound: a_rx,
            control: Arc::clone(&control),
        };
        let b = Self {
            name: "memory-b".to_string(),
            outbound: Some(b_tx),
            inbound: b_rx,
            control,
        };
        (a, b)
    }

    /// Shared fault injection handle
    pub fn control(&self) -> Arc<LinkControl> {
        Arc::clone(&self.control)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::LinkClosed)?;
        encode_frame(payload)?;

        if self.control.failing() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected send failure",
            )));
        }
        if self.control.dropping() {
            trace!("{} dropped {} byte frame", self.name, payload.len());
            return Ok(());
        }

        outbound
            .send(payload.to_vec())
            .await
            .map_err(|_| TransportError::LinkClosed)
    }

    async fn receive(&mut self) -> Result<Option<TransportEvent>, TransportError> {
        Ok(self.inbound.recv().await.map(TransportEvent::Frame))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.outbound = None;
        self.inbound.close();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
