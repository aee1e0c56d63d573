//! Presentation side of the concurrency bridge
//!
//! The presentation context owns a `PresentationBridge`. It submits chat
//! messages without ever waiting on the worker, and consumes app events
//! either by draining them from its own loop or by awaiting the next one.
//! Every callback into the `Presenter` runs on the caller's context.

use tracing::{debug, warn};

use crate::channel::{
    AppEvent, AppEventReceiver, Command, CommandSender, LinkStatus, NonBlockingSend, Notice,
    SessionStats, ShutdownSender,
};
use crate::config::ProtocolConfig;
use crate::delivery::DeliveryStatus;
use crate::errors::Result;
use crate::message::ChatMessage;
use crate::types::{MessageId, SystemTimeSource, TimeSource};
use crate::validation::Username;

// ----------------------------------------------------------------------------
// Presenter Trait
// ----------------------------------------------------------------------------

/// Callbacks the presentation layer implements
pub trait Presenter {
    /// A peer's chat message arrived
    fn show_chat(&mut self, message: &ChatMessage);

    /// One of our messages changed status
    fn update_status(
        &mut self,
        message_id: &MessageId,
        status: DeliveryStatus,
        acknowledged_by: Option<&str>,
    );

    fn show_status_report(&mut self, _message_id: &MessageId, _status: Option<DeliveryStatus>) {}

    fn show_stats(&mut self, _stats: &SessionStats) {}

    fn show_link_status(&mut self, _status: &LinkStatus) {}

    fn show_notice(&mut self, _notice: &Notice) {}
}

// ----------------------------------------------------------------------------
// Presentation Bridge
// ----------------------------------------------------------------------------

pub struct PresentationBridge<T: TimeSource = SystemTimeSource> {
    username: Username,
    protocol: ProtocolConfig,
    time_source: T,
    commands: CommandSender,
    events: AppEventReceiver,
    shutdown: ShutdownSender,
}

impl PresentationBridge<SystemTimeSource> {
    pub fn new(
        username: Username,
        protocol: ProtocolConfig,
        commands: CommandSender,
        events: AppEventReceiver,
        shutdown: ShutdownSender,
    ) -> Self {
        Self::with_time_source(username, protocol, commands, events, shutdown, SystemTimeSource)
    }
}

impl<T: TimeSource> PresentationBridge<T> {
    pub fn with_time_source(
        username: Username,
        protocol: ProtocolConfig,
        commands: CommandSender,
        events: AppEventReceiver,
        shutdown: ShutdownSender,
        time_source: T,
    ) -> Self {
        Self {
            username,
            protocol,
            time_source,
            commands,
            events,
            shutdown,
        }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Validate `content`, build a chat message and queue it for transmission
    ///
    /// Returns the message so the caller can display it immediately in the
    /// `Sent` state. Never blocks: a full queue is reported as
    /// `ChannelError::ChannelFull` instead of dropping the message.
    pub fn submit(&self, content: &str) -> Result<ChatMessage> {
        let message =
            ChatMessage::compose(&self.username, content, &self.protocol, self.time_source.now())?;
        self.commands
            .try_send_non_blocking(Command::SendChat(message.clone()))?;
        debug!("Queued message {} for transmission", message.id);
        Ok(message)
    }

    /// Ask the worker for a message's status; answered by `AppEvent::StatusReport`
    pub fn query_status(&self, message_id: MessageId) -> Result<()> {
        self.commands
            .try_send_non_blocking(Command::QueryStatus { message_id })?;
        Ok(())
    }

    /// Ask the worker for counters; answered by `AppEvent::SessionStats`
    pub fn request_stats(&self) -> Result<()> {
        self.commands
            .try_send_non_blocking(Command::GetSessionStats)?;
        Ok(())
    }

    /// Dispatch every event already queued, in order, without waiting
    ///
    /// Returns the number of events handled.
    pub fn drain(&mut self, presenter: &mut dyn Presenter) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            dispatch(presenter, event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event; `None` once the worker has stopped
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events.recv().await
    }

    /// Whether the worker is still accepting commands
    pub fn is_connected(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Signal the worker to stop; queued outbound messages are discarded
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Route one app event to the matching presenter callback
pub fn dispatch(presenter: &mut dyn Presenter, event: AppEvent) {
    match event {
        AppEvent::ChatReceived(message) => presenter.show_chat(&message),
        AppEvent::StatusChanged {
            message_id,
            status,
            acknowledged_by,
        } => presenter.update_status(&message_id, status, acknowledged_by.as_deref()),
        AppEvent::StatusReport { message_id, status } => {
            presenter.show_status_report(&message_id, status)
        }
        AppEvent::SessionStats(stats) => presenter.show_stats(&stats),
        AppEvent::LinkStatus(status) => presenter.show_link_status(&status),
        AppEvent::Notice(notice) => presenter.show_notice(&notice),
    }
}

impl<T: TimeSource> Drop for PresentationBridge<T> {
    fn drop(&mut self) {
        if !*self.shutdown.borrow() && self.is_connected() {
            warn!("Presentation bridge dropped without shutdown; stopping session");
        }
        self.shutdown.send_replace(true);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
