//! Serial line framing for the LoRa modem
//!
//! The modem firmware exchanges newline-terminated text lines. Radio payloads
//! are wrapped in `<LoRa-Message-Package>` tags; transmit completion reports
//! arrive wrapped in `<Lora-System-Info-Tx-Done>` tags. Everything else on
//! the line is firmware chatter.

use serde_json::Value;
use tracing::warn;

use crate::errors::TransportError;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

pub const FRAME_OPEN: &str = "<LoRa-Message-Package>";
pub const FRAME_CLOSE: &str = "</LoRa-Message-Package>";
pub const TX_DONE_OPEN: &str = "<Lora-System-Info-Tx-Done>";
pub const TX_DONE_CLOSE: &str = "</Lora-System-Info-Tx-Done>";

/// Default cap on a single buffered line
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

// ----------------------------------------------------------------------------
// Outbound
// ----------------------------------------------------------------------------

/// Wrap one encoded record into a complete modem frame, newline included
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let text = std::str::from_utf8(payload).map_err(|_| TransportError::InvalidFrame {
        reason: "payload is not valid UTF-8".to_string(),
    })?;
    if text.contains('\n') || text.contains('\r') {
        return Err(TransportError::InvalidFrame {
            reason: "payload contains a line break".to_string(),
        });
    }
    if text.contains(FRAME_CLOSE) {
        return Err(TransportError::InvalidFrame {
            reason: "payload contains the closing frame tag".to_string(),
        });
    }

    let mut frame = Vec::with_capacity(FRAME_OPEN.len() + payload.len() + FRAME_CLOSE.len() + 1);
    frame.extend_from_slice(FRAME_OPEN.as_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(FRAME_CLOSE.as_bytes());
    frame.push(b'\n');
    Ok(frame)
}

// ----------------------------------------------------------------------------
// Inbound
// ----------------------------------------------------------------------------

/// Transmit completion report emitted by the modem after each frame
#[derive(Debug, Clone, PartialEq)]
pub struct TxReport {
    /// Text between the tags, verbatim
    pub raw: String,
    /// Parsed JSON, or `None` when the firmware sent something unparseable
    pub info: Option<Value>,
}

impl TxReport {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            info: serde_json::from_str(raw).ok(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.info.is_none()
    }
}

/// One classified line from the modem
#[derive(Debug, Clone, PartialEq)]
pub enum SerialLine {
    /// Received radio payload, ready for the codec
    Payload(String),
    TxDone(TxReport),
    /// Diagnostics or anything else the firmware printed
    Other(String),
}

/// Classify a complete line (without its terminator)
pub fn parse_line(line: &str) -> SerialLine {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if let Some(payload) = between(line, FRAME_OPEN, FRAME_CLOSE) {
        return SerialLine::Payload(payload.to_string());
    }
    if let Some(raw) = between(line, TX_DONE_OPEN, TX_DONE_CLOSE) {
        return SerialLine::TxDone(TxReport::parse(raw));
    }
    SerialLine::Other(line.to_string())
}

/// Text between the first `open` and the next `close` after it
fn between<'a>(line: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = line.find(open)? + open.len();
    let len = line[start..].find(close)?;
    Some(&line[start..start + len])
}

// ----------------------------------------------------------------------------
// Line Assembler
// ----------------------------------------------------------------------------

/// Reassembles lines from arbitrary read chunks
#[derive(Debug)]
pub struct LineAssembler {
    buf: Vec<u8>,
    max_line_bytes: usize,
    /// Set while skipping the rest of an oversized line
    discarding: bool,
}

impl LineAssembler {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_bytes: max_line_bytes.max(1),
            discarding: false,
        }
    }

    /// Feed a chunk and collect every line it completes
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the codec reports it
    /// later if it lands inside a payload.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for segment in chunk.split_inclusive(|b| *b == b'\n') {
            let complete = segment.last() == Some(&b'\n');
            let body = if complete {
                &segment[..segment.len() - 1]
            } else {
                segment
            };

            if !self.discarding {
                if self.buf.len() + body.len() > self.max_line_bytes {
                    warn!(
                        "Discarding serial line longer than {} bytes",
                        self.max_line_bytes
                    );
                    self.buf.clear();
                    self.discarding = true;
                } else {
                    self.buf.extend_from_slice(body);
                }
            }

            if complete {
                if !self.discarding {
                    lines.push(String::from_utf8_lossy(&self.buf).into_owned());
                }
                self.buf.clear();
                self.discarding = false;
            }
        }
        lines
    }

    /// Bytes of the line currently being assembled
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame() {
        let frame = encode_frame(br#"{"type":"ping"}"#).unwrap();
        assert_eq!(
            frame,
            b"<LoRa-Message-Package>{\"type\":\"ping\"}</LoRa-Message-Package>\n".to_vec()
        );
    }

    #[test]
    fn test_encode_frame_rejects_breaking_payloads() {
        assert!(matches!(
            encode_frame(b"a\nb"),
            Err(TransportError::InvalidFrame { .. })
        ));
        assert!(matches!(
            encode_frame(b"x</LoRa-Message-Package>y"),
            Err(TransportError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_parse_payload_line() {
        let line = "+RX <LoRa-Message-Package>{\"a\":1}</LoRa-Message-Package> rssi=-80\r";
        assert_eq!(parse_line(line), SerialLine::Payload("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_parse_tx_done_line() {
        match parse_line("<Lora-System-Info-Tx-Done>{\"airtime\":120}</Lora-System-Info-Tx-Done>") {
            SerialLine::TxDone(report) => {
                assert!(!report.is_malformed());
                assert_eq!(report.info.unwrap()["airtime"], 120);
            }
            other => panic!("unexpected {:?}", other),
        }

        match parse_line("<Lora-System-Info-Tx-Done>oops</Lora-System-Info-Tx-Done>") {
            SerialLine::TxDone(report) => {
                assert!(report.is_malformed());
                assert_eq!(report.raw, "oops");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_tag_is_other() {
        assert_eq!(
            parse_line("<LoRa-Message-Package>partial"),
            SerialLine::Other("<LoRa-Message-Package>partial".to_string())
        );
        assert_eq!(parse_line("boot ok"), SerialLine::Other("boot ok".to_string()));
    }

    #[test]
    fn test_assembler_joins_split_reads() {
        let mut assembler = LineAssembler::default();
        assert!(assembler.push(b"hel").is_empty());
        assert_eq!(assembler.pending(), 3);
        assert_eq!(assembler.push(b"lo\nwor"), vec!["hello".to_string()]);
        assert_eq!(
            assembler.push(b"ld\n\nx\n"),
            vec!["world".to_string(), String::new(), "x".to_string()]
        );
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_assembler_drops_oversized_line() {
        let mut assembler = LineAssembler::new(4);
        assert!(assembler.push(b"abc").is_empty());
        assert!(assembler.push(b"defgh").is_empty());
        assert_eq!(assembler.push(b"ij\nok\n"), vec!["ok".to_string()]);
    }

    #[test]
    fn test_assembler_replaces_invalid_utf8() {
        let mut assembler = LineAssembler::default();
        let lines = assembler.push(&[b'a', 0xff, b'\n']);
        assert_eq!(lines, vec!["a\u{fffd}".to_string()]);
    }
}
