//! Serial port discovery

use lorachat_core::TransportError;
use tracing::{debug, warn};

/// Choose the most likely modem among `candidates`
///
/// USB CDC devices (`ttyACM*`, `usbmodem*`) and Windows `COM*` ports are
/// preferred; otherwise the first candidate wins.
pub fn pick_port(candidates: &[String]) -> Option<&str> {
    candidates
        .iter()
        .find(|name| {
            let upper = name.to_uppercase();
            upper.contains("TTYACM") || upper.contains("USBMODEM") || upper.starts_with("COM")
        })
        .or_else(|| candidates.first())
        .map(String::as_str)
}

/// Resolve the port to open: the explicit one if given, else auto-detect
pub fn resolve_port(explicit: Option<&str>) -> Result<String, TransportError> {
    if let Some(port) = explicit {
        return Ok(port.to_string());
    }

    let candidates: Vec<String> = match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|info| info.port_name).collect(),
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    };
    debug!("Serial port candidates: {:?}", candidates);

    pick_port(&candidates)
        .map(str::to_string)
        .ok_or(TransportError::NoPortFound)
}
