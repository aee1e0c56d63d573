//! Session Worker
//!
//! The single execution context for all transport I/O. It owns the delivery
//! tracker and the inbound router; the presentation context only ever sees
//! their effects as `AppEvent`s.

use lorachat_core::{
    channel::{AppEventSender, CommandReceiver, ShutdownReceiver},
    AppEvent, ChannelError, Command, DeliveryStatus, DeliveryTracker, InboundRouter, LinkStatus,
    LoraChatError, Notice, ProtocolConfig, Result, RouteAction, SessionStats, TimeSource,
    Transport, TransportEvent, Username, WireCodec, WireMessage,
};
use tracing::{debug, error, info, trace, warn};

// ----------------------------------------------------------------------------
// Session Worker
// ----------------------------------------------------------------------------

pub struct SessionWorker<Tr: Transport, T: TimeSource> {
    transport: Tr,
    tracker: DeliveryTracker<T>,
    router: InboundRouter<T>,
    commands: CommandReceiver,
    app_events: AppEventSender,
    shutdown: ShutdownReceiver,
    stats: SessionStats,
    /// False once the transport reported end of stream
    link_open: bool,
    running: bool,
}

impl<Tr: Transport, T: TimeSource + Clone> SessionWorker<Tr, T> {
    pub fn new(
        username: &Username,
        protocol: &ProtocolConfig,
        transport: Tr,
        commands: CommandReceiver,
        app_events: AppEventSender,
        shutdown: ShutdownReceiver,
        time_source: T,
    ) -> Self {
        Self {
            transport,
            tracker: DeliveryTracker::with_capacity(
                protocol.max_tracked_messages,
                time_source.clone(),
            ),
            router: InboundRouter::new(
                username.as_str(),
                protocol.ignore_own_echo,
                protocol.dedup_capacity,
                time_source,
            ),
            commands,
            app_events,
            shutdown,
            stats: SessionStats::default(),
            link_open: true,
            running: true,
        }
    }

    /// Run until shutdown is signalled, the presentation goes away, or an
    /// unrecoverable error occurs. Returns the final session counters.
    pub async fn run(mut self) -> Result<SessionStats> {
        info!(
            "Session worker starting for {} on {}",
            self.router.local_username(),
            self.transport.name()
        );
        let transport = self.transport.name().to_string();
        if let Err(e) = self.send_app_event(AppEvent::LinkStatus(LinkStatus::Up { transport })).await {
            error!("Presentation unavailable at startup: {}", e);
            self.running = false;
        }

        while self.running {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Shutdown signalled");
                        break;
                    }
                }

                command = self.commands.recv() => {
                    match command {
                        Some(cmd) => {
                            trace!("Processing command {}", cmd.name());
                            if let Err(e) = self.process_command(cmd).await {
                                self.handle_error("command", e);
                            }
                        }
                        None => {
                            info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }

                event = self.transport.receive(), if self.link_open => {
                    let outcome = match event {
                        Ok(Some(evt)) => self.process_transport_event(evt).await,
                        Ok(None) => self.handle_link_closed().await,
                        Err(e) => {
                            warn!("Receive error on {}: {}", self.transport.name(), e);
                            self.send_app_event(AppEvent::Notice(Notice::error(format!(
                                "RX error: {}",
                                e
                            ))))
                            .await
                        }
                    };
                    if let Err(e) = outcome {
                        self.handle_error("transport event", e);
                    }
                }
            }
        }

        self.finish().await
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn process_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SendChat(message) => {
                let message_id = message.id.clone();
                // Tracked before transmission so a failed send still shows as Sent
                self.tracker.record_sent(message_id.clone());

                let outcome = match WireCodec::encode(&WireMessage::Chat(message)) {
                    Ok(bytes) => self.transport.send(&bytes).await.map_err(LoraChatError::from),
                    Err(e) => Err(e.into()),
                };

                match outcome {
                    Ok(()) => {
                        self.stats.frames_sent += 1;
                        debug!("Sent message {}", message_id);
                        Ok(())
                    }
                    Err(e) => {
                        self.stats.send_errors += 1;
                        warn!("Failed to send message {}: {}", message_id, e);
                        self.send_app_event(AppEvent::Notice(Notice::error(format!(
                            "Send error: {}",
                            e
                        ))))
                        .await
                    }
                }
            }
            Command::QueryStatus { message_id } => {
                let status = self.tracker.status_of(&message_id);
                self.send_app_event(AppEvent::StatusReport { message_id, status })
                    .await
            }
            Command::GetSessionStats => {
                let stats = self.session_stats();
                self.send_app_event(AppEvent::SessionStats(stats)).await
            }
        }
    }

    // ------------------------------------------------------------------------
    // Transport Events
    // ------------------------------------------------------------------------

    async fn process_transport_event(&mut self, event: TransportEvent) -> Result<()> {
        match event {
            TransportEvent::Frame(payload) => {
                self.stats.frames_received += 1;
                match self.router.route_frame(&payload, &mut self.tracker) {
                    Ok(action) => self.apply_route(action).await,
                    Err(e) => {
                        self.stats.decode_errors += 1;
                        debug!("Dropping undecodable frame: {}", e);
                        Ok(())
                    }
                }
            }
            TransportEvent::TxDone(report) => {
                self.stats.tx_reports += 1;
                if report.is_malformed() {
                    debug!("Unparseable tx report: {}", report.raw);
                } else {
                    trace!("Tx done: {}", report.raw);
                }
                Ok(())
            }
        }
    }

    async fn apply_route(&mut self, action: RouteAction) -> Result<()> {
        match action {
            RouteAction::Display { message, ack } => {
                let message_id = message.id.clone();
                self.send_app_event(AppEvent::ChatReceived(message)).await?;

                // Fire and forget: a lost ack only leaves the sender at Sent
                match WireCodec::encode(&WireMessage::Ack(ack)) {
                    Ok(bytes) => match self.transport.send(&bytes).await {
                        Ok(()) => {
                            self.stats.frames_sent += 1;
                            self.stats.acks_sent += 1;
                        }
                        Err(e) => debug!("Failed to send ack for {}: {}", message_id, e),
                    },
                    Err(e) => debug!("Failed to encode ack for {}: {}", message_id, e),
                }
                Ok(())
            }
            RouteAction::Acknowledged {
                message_id,
                acknowledged_by,
            } => {
                self.send_app_event(AppEvent::StatusChanged {
                    message_id,
                    status: DeliveryStatus::Acknowledged,
                    acknowledged_by: Some(acknowledged_by),
                })
                .await
            }
            RouteAction::AlreadyAcknowledged { message_id } => {
                trace!("Repeated ack for {}", message_id);
                Ok(())
            }
            RouteAction::UnknownAck { message_id } => {
                debug!("Ack for untracked message {}", message_id);
                Ok(())
            }
            RouteAction::IgnoredEcho { .. } | RouteAction::IgnoredDuplicate { .. } => Ok(()),
        }
    }

    async fn handle_link_closed(&mut self) -> Result<()> {
        self.link_open = false;
        warn!("Transport {} closed", self.transport.name());
        self.send_app_event(AppEvent::LinkStatus(LinkStatus::Down {
            reason: "link closed".to_string(),
        }))
        .await
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Waits for queue space, but gives the event up once shutdown is
    /// signalled so a presentation that stopped reading cannot stall the worker
    async fn send_app_event(&mut self, event: AppEvent) -> Result<()> {
        tokio::select! {
            biased;

            sent = self.app_events.send(event) => {
                sent.map_err(|_| LoraChatError::Channel(ChannelError::ChannelClosed))
            }

            _ = shutdown_requested(&mut self.shutdown) => {
                debug!("Shutdown signalled with the event queue full, dropping event");
                self.running = false;
                Ok(())
            }
        }
    }

    fn handle_error(&mut self, context: &str, e: LoraChatError) {
        match e {
            // Unrecoverable: nobody is listening or the session is misconfigured
            LoraChatError::Channel(_) | LoraChatError::Configuration { .. } => {
                error!(
                    "Unrecoverable error processing {}, stopping session: {}",
                    context, e
                );
                self.running = false;
            }
            _ => error!("Error processing {}: {}", context, e),
        }
    }

    fn session_stats(&self) -> SessionStats {
        SessionStats {
            delivery: self.tracker.stats(),
            ..self.stats
        }
    }

    /// Discard pending outbound work and release the link
    async fn finish(mut self) -> Result<SessionStats> {
        self.commands.close();
        let mut discarded = 0usize;
        while let Ok(command) = self.commands.try_recv() {
            if matches!(command, Command::SendChat(_)) {
                discarded += 1;
            }
        }
        if discarded > 0 {
            debug!("Discarded {} pending outbound messages", discarded);
        }

        if let Err(e) = self.transport.close().await {
            warn!("Error closing transport {}: {}", self.transport.name(), e);
        }
        let _ = self.app_events.try_send(AppEvent::LinkStatus(LinkStatus::Down {
            reason: "session stopped".to_string(),
        }));

        info!("Session worker stopped");
        Ok(self.session_stats())
    }
}

/// Resolves once shutdown is set or the signalling side is gone
async fn shutdown_requested(shutdown: &mut ShutdownReceiver) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
