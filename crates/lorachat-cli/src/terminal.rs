//! Line-oriented terminal presenter
//!
//! Renders chat traffic as plain lines on any `Write` (stdout in the binary,
//! a buffer in tests). A terminal line cannot be edited after the fact, so a
//! status change reprints the message with its new marker.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use chrono::{Local, TimeZone, Utc};
use lorachat_core::{
    ChatMessage, DeliveryStatus, LinkStatus, MessageId, Notice, NoticeLevel, Presenter,
    SessionStats, Timestamp,
};
use tracing::debug;

use crate::commands::HELP_TEXT;

/// Own messages remembered for reprinting on status changes
const MAX_REMEMBERED: usize = 512;

/// Which clock `HH:MM` is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDisplay {
    Local,
    Utc,
}

pub struct TerminalPresenter<W: Write> {
    out: W,
    time_display: TimeDisplay,
    own_messages: HashMap<MessageId, ChatMessage>,
    /// Insertion order for `own_messages`, oldest first
    own_order: Vec<MessageId>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            time_display: TimeDisplay::Local,
            own_messages: HashMap::new(),
            own_order: Vec::new(),
        }
    }

    pub fn with_time_display(mut self, time_display: TimeDisplay) -> Self {
        self.time_display = time_display;
        self
    }

    pub fn banner(&mut self, username: &str) {
        self.line(format_args!(
            "LoRa chat as @{}. Type a message and press Enter, /help for commands.",
            username
        ));
    }

    /// Show a message we just submitted, in the `Sent` state
    pub fn show_own(&mut self, message: &ChatMessage) {
        if self.own_order.len() >= MAX_REMEMBERED {
            let oldest = self.own_order.remove(0);
            self.own_messages.remove(&oldest);
        }
        self.own_order.push(message.id.clone());
        self.own_messages
            .insert(message.id.clone(), message.clone());
        self.render_own(message, "✓ Sent");
    }

    pub fn show_help(&mut self) {
        self.line(format_args!("{}", HELP_TEXT));
    }

    /// Bracketed system line, e.g. input errors
    pub fn show_system(&mut self, text: &str) {
        self.line(format_args!("[{}]", text));
    }

    fn render_own(&mut self, message: &ChatMessage, marker: &str) {
        let time = format_time(message.timestamp, self.time_display);
        self.line(format_args!(
            "{}  {}  {}  #{}",
            time, message.content, marker, message.id
        ));
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{}", args).and_then(|_| self.out.flush()) {
            debug!("Terminal write failed: {}", e);
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show_chat(&mut self, message: &ChatMessage) {
        let time = format_time(message.timestamp, self.time_display);
        self.line(format_args!("@{}  {}", message.username, time));
        self.line(format_args!("{}", message.content));
    }

    fn update_status(
        &mut self,
        message_id: &MessageId,
        status: DeliveryStatus,
        acknowledged_by: Option<&str>,
    ) {
        let marker = match (status, acknowledged_by) {
            (DeliveryStatus::Sent, _) => "✓ Sent".to_string(),
            (DeliveryStatus::Acknowledged, Some(name)) => format!("✓✓ Read by {}", name),
            (DeliveryStatus::Acknowledged, None) => "✓✓ Read".to_string(),
        };
        match self.own_messages.get(message_id).cloned() {
            Some(message) => self.render_own(&message, &marker),
            None => self.line(format_args!("[#{} {}]", message_id, marker)),
        }
    }

    fn show_status_report(&mut self, message_id: &MessageId, status: Option<DeliveryStatus>) {
        let label = status.map(|s| s.label()).unwrap_or("unknown");
        self.line(format_args!("[#{}: {}]", message_id, label));
    }

    fn show_stats(&mut self, stats: &SessionStats) {
        self.line(format_args!(
            "[tracked {} (sent {}, read {}) {:.0}% read | frames tx {} rx {} | acks sent {} | decode errors {} | send errors {} | tx reports {}]",
            stats.delivery.total,
            stats.delivery.sent,
            stats.delivery.acknowledged,
            stats.delivery.read_rate() * 100.0,
            stats.frames_sent,
            stats.frames_received,
            stats.acks_sent,
            stats.decode_errors,
            stats.send_errors,
            stats.tx_reports
        ));
    }

    fn show_link_status(&mut self, status: &LinkStatus) {
        self.line(format_args!("[{}]", status));
    }

    fn show_notice(&mut self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => self.line(format_args!("[{}]", notice.text)),
            NoticeLevel::Warning | NoticeLevel::Error => {
                self.line(format_args!("[!] {}", notice.text))
            }
        }
    }
}

/// `HH:MM` for a wire timestamp, or `--:--` if it is not representable
pub fn format_time(timestamp: Timestamp, display: TimeDisplay) -> String {
    let secs = timestamp.as_secs_f64();
    if !secs.is_finite() || secs.abs() > i64::MAX as f64 {
        return "--:--".to_string();
    }
    let whole = secs.floor() as i64;
    let formatted = match display {
        TimeDisplay::Local => Local
            .timestamp_opt(whole, 0)
            .single()
            .map(|t| t.format("%H:%M").to_string()),
        TimeDisplay::Utc => Utc
            .timestamp_opt(whole, 0)
            .single()
            .map(|t| t.format("%H:%M").to_string()),
    };
    formatted.unwrap_or_else(|| "--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorachat_core::DeliveryStats;

    fn presenter() -> TerminalPresenter<Vec<u8>> {
        TerminalPresenter::new(Vec::new()).with_time_display(TimeDisplay::Utc)
    }

    fn output(presenter: TerminalPresenter<Vec<u8>>) -> String {
        String::from_utf8(presenter.out).unwrap()
    }

    // 1970-01-02 03:04:05 UTC
    const TS: f64 = 97_445.0;

    #[test]
    fn test_own_message_then_read_receipt() {
        let mut p = presenter();
        let message = ChatMessage::new(
            MessageId::from("a1b2"),
            "alice",
            "hi bob",
            Timestamp::from_secs_f64(TS),
        );
        p.show_own(&message);
        p.update_status(
            &message.id,
            DeliveryStatus::Acknowledged,
            Some("bob"),
        );

        assert_eq!(
            output(p),
            "03:04  hi bob  ✓ Sent  #a1b2\n03:04  hi bob  ✓✓ Read by bob  #a1b2\n"
        );
    }

    #[test]
    fn test_incoming_chat() {
        let mut p = presenter();
        p.show_chat(&ChatMessage::new(
            MessageId::from("m1"),
            "bob",
            "hello",
            Timestamp::from_secs_f64(TS),
        ));
        assert_eq!(output(p), "@bob  03:04\nhello\n");
    }

    #[test]
    fn test_system_lines() {
        let mut p = presenter();
        p.show_status_report(&MessageId::from("zz"), None);
        p.show_notice(&Notice::error("Send error: Link closed"));
        p.update_status(&MessageId::from("gone"), DeliveryStatus::Acknowledged, None);
        assert_eq!(
            output(p),
            "[#zz: unknown]\n[!] Send error: Link closed\n[#gone ✓✓ Read]\n"
        );
    }

    #[test]
    fn test_stats_line_includes_read_rate() {
        let mut p = presenter();
        let stats = SessionStats {
            delivery: DeliveryStats {
                total: 4,
                sent: 1,
                acknowledged: 3,
            },
            frames_sent: 4,
            frames_received: 3,
            ..SessionStats::default()
        };
        p.show_stats(&stats);
        assert!(output(p).starts_with("[tracked 4 (sent 1, read 3) 75% read | frames tx 4 rx 3 |"));
    }

    #[test]
    fn test_format_time_edge_cases() {
        assert_eq!(
            format_time(Timestamp::from_secs_f64(f64::NAN), TimeDisplay::Utc),
            "--:--"
        );
        assert_eq!(
            format_time(Timestamp::from_secs_f64(59.9), TimeDisplay::Utc),
            "00:00"
        );
    }
}
