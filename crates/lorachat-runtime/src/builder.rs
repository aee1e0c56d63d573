//! Session Builder API
//!
//! Wires channels, the session worker and the presentation bridge together
//! for any `Transport`, so the CLI and the tests start sessions the same way.

use lorachat_core::{
    channel::{create_app_event_channel, create_command_channel, create_shutdown_signal},
    ChannelConfig, LoraChatError, PresentationBridge, ProtocolConfig, Result, SessionStats,
    SystemTimeSource, TimeSource, Transport, TransportError, Username,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::worker::SessionWorker;

// ----------------------------------------------------------------------------
// Session Builder
// ----------------------------------------------------------------------------

pub struct SessionBuilder<T: TimeSource = SystemTimeSource> {
    username: Username,
    protocol: ProtocolConfig,
    channels: ChannelConfig,
    time_source: T,
}

impl SessionBuilder<SystemTimeSource> {
    pub fn new(username: Username) -> Self {
        Self {
            username,
            protocol: ProtocolConfig::default(),
            channels: ChannelConfig::default(),
            time_source: SystemTimeSource,
        }
    }
}

impl<T> SessionBuilder<T>
where
    T: TimeSource + Clone + Send + 'static,
{
    pub fn with_protocol(mut self, protocol: ProtocolConfig) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_channels(mut self, channels: ChannelConfig) -> Self {
        self.channels = channels;
        self
    }

    /// Use a different clock for message, ack and record timestamps
    pub fn with_time_source<U>(self, time_source: U) -> SessionBuilder<U>
    where
        U: TimeSource + Clone + Send + 'static,
    {
        SessionBuilder {
            username: self.username,
            protocol: self.protocol,
            channels: self.channels,
            time_source,
        }
    }

    /// Validate configuration, spawn the worker on `transport` and return the
    /// presentation handle plus the worker task
    pub fn build_and_start<Tr>(self, transport: Tr) -> Result<(PresentationBridge<T>, SessionTask)>
    where
        Tr: Transport + 'static,
    {
        self.protocol.validate()?;
        self.channels.validate()?;

        info!(
            "Starting session for {} on {}",
            self.username,
            transport.name()
        );

        let (command_sender, command_receiver) = create_command_channel(&self.channels);
        let (app_event_sender, app_event_receiver) = create_app_event_channel(&self.channels);
        let (shutdown_sender, shutdown_receiver) = create_shutdown_signal();

        let worker = SessionWorker::new(
            &self.username,
            &self.protocol,
            transport,
            command_receiver,
            app_event_sender,
            shutdown_receiver,
            self.time_source.clone(),
        );
        let handle = tokio::spawn(worker.run());

        let bridge = PresentationBridge::with_time_source(
            self.username,
            self.protocol,
            command_sender,
            app_event_receiver,
            shutdown_sender,
            self.time_source,
        );

        Ok((bridge, SessionTask { handle }))
    }
}

// ----------------------------------------------------------------------------
// Session Task
// ----------------------------------------------------------------------------

/// Handle to the running session worker
pub struct SessionTask {
    handle: JoinHandle<Result<SessionStats>>,
}

impl SessionTask {
    /// Wait for the worker to stop and return its final counters
    pub async fn join(self) -> Result<SessionStats> {
        self.handle.await.map_err(|e| {
            LoraChatError::Transport(TransportError::Shutdown {
                reason: format!("session worker failed: {}", e),
            })
        })?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
