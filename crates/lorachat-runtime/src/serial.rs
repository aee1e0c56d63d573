//! Serial modem transport
//!
//! Blocking reads live on one dedicated thread that assembles lines and
//! forwards classified events over a bounded channel. Writes run on the
//! blocking pool so a slow UART never stalls the async worker.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use lorachat_core::{
    framing::{encode_frame, parse_line, LineAssembler, SerialLine, DEFAULT_MAX_LINE_BYTES},
    Transport, TransportError, TransportEvent,
};
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::port::resolve_port;

const READ_CHUNK_BYTES: usize = 1024;
/// Pause after a zero-length read so a quiet port is not spun on
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

// ----------------------------------------------------------------------------
// Serial Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Explicit device path; auto-detected when `None`
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Longest modem line kept before it is discarded
    pub max_line_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
            read_timeout_ms: 100,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl SerialConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.baud_rate == 0 {
            return Err("Baud rate cannot be zero".into());
        }
        if self.read_timeout_ms == 0 {
            return Err("Read timeout cannot be zero".into());
        }
        if self.max_line_bytes == 0 {
            return Err("Max line bytes cannot be zero".into());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Serial Transport
// ----------------------------------------------------------------------------

type InboundItem = Result<TransportEvent, TransportError>;

pub struct SerialTransport {
    port_name: String,
    /// Taken while a write is in flight on the blocking pool
    writer: Option<Box<dyn SerialPort>>,
    events: mpsc::Receiver<InboundItem>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Open the configured (or auto-detected) port as 8N1 and start the reader
    pub fn open(config: &SerialConfig, inbound_buffer: usize) -> Result<Self, TransportError> {
        let port_name = resolve_port(config.port.as_deref())?;
        info!("Opening {} at {} baud", port_name, config.baud_rate);

        let port = serialport::new(&port_name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|e| TransportError::OpenFailed {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;
        let reader_port = port.try_clone().map_err(|e| TransportError::OpenFailed {
            port: port_name.clone(),
            reason: e.to_string(),
        })?;

        let (sender, events) = mpsc::channel(inbound_buffer.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let reader_stop = Arc::clone(&stop);
        let max_line_bytes = config.max_line_bytes;
        let reader = std::thread::Builder::new()
            .name("lora-serial-reader".to_string())
            .spawn(move || read_loop(reader_port, sender, reader_stop, max_line_bytes))?;

        Ok(Self {
            port_name,
            writer: Some(port),
            events,
            stop,
            reader: Some(reader),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let frame = encode_frame(payload)?;
        let mut writer = self.writer.take().ok_or(TransportError::LinkClosed)?;

        let (writer, result) = tokio::task::spawn_blocking(move || {
            let result = writer.write_all(&frame).and_then(|_| writer.flush());
            (writer, result)
        })
        .await
        .map_err(|e| TransportError::Shutdown {
            reason: format!("serial writer task failed: {}", e),
        })?;

        self.writer = Some(writer);
        result?;
        trace!("Wrote {} byte frame to {}", payload.len(), self.port_name);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<TransportEvent>, TransportError> {
        match self.events.recv().await {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stop.store(true, Ordering::SeqCst);
        // Unblocks a reader waiting on a full channel
        self.events.close();
        self.writer = None;

        if let Some(reader) = self.reader.take() {
            tokio::task::spawn_blocking(move || reader.join())
                .await
                .map_err(|e| TransportError::Shutdown {
                    reason: e.to_string(),
                })?
                .map_err(|_| TransportError::Shutdown {
                    reason: "serial reader thread panicked".to_string(),
                })?;
        }
        debug!("Closed {}", self.port_name);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.port_name
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        // The reader notices within one read timeout
        self.stop.store(true, Ordering::SeqCst);
    }
}

// ----------------------------------------------------------------------------
// Reader Thread
// ----------------------------------------------------------------------------

fn read_loop<R: Read>(
    mut port: R,
    events: mpsc::Sender<InboundItem>,
    stop: Arc<AtomicBool>,
    max_line_bytes: usize,
) {
    let mut assembler = LineAssembler::new(max_line_bytes);
    let mut buf = [0u8; READ_CHUNK_BYTES];

    while !stop.load(Ordering::SeqCst) {
        match port.read(&mut buf) {
            Ok(0) => std::thread::sleep(IDLE_BACKOFF),
            Ok(n) => {
                for line in assembler.push(&buf[..n]) {
                    let event = match parse_line(&line) {
                        SerialLine::Payload(payload) => TransportEvent::Frame(payload.into_bytes()),
                        SerialLine::TxDone(report) => TransportEvent::TxDone(report),
                        SerialLine::Other(text) => {
                            trace!("modem: {}", text);
                            continue;
                        }
                    };
                    if events.blocking_send(Ok(event)).is_err() {
                        return;
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                error!("Serial read failed: {}", e);
                let _ = events.blocking_send(Err(TransportError::Io(e)));
                return;
            }
        }
    }
    debug!("Serial reader stopped");
}
