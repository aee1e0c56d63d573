//! Interactive chat loop
//!
//! Reads lines from the user, hands them to the presentation bridge and
//! renders whatever the session worker reports back.

use std::future::Future;
use std::io::Write;

use lorachat_core::{
    dispatch, ChannelError, LoraChatError, PresentationBridge, SessionStats, SystemTimeSource,
    TimeSource,
};
use lorachat_runtime::SessionTask;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::commands::{parse_input, InputLine};
use crate::error::Result;
use crate::terminal::TerminalPresenter;

/// Whether the loop should keep reading input after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct ChatApp<W: Write, T: TimeSource = SystemTimeSource> {
    bridge: PresentationBridge<T>,
    task: SessionTask,
    presenter: TerminalPresenter<W>,
}

impl<W: Write, T: TimeSource> ChatApp<W, T> {
    pub fn new(
        bridge: PresentationBridge<T>,
        task: SessionTask,
        presenter: TerminalPresenter<W>,
    ) -> Self {
        Self {
            bridge,
            task,
            presenter,
        }
    }

    /// Run until the user quits, input ends, `shutdown` resolves or the
    /// session stops on its own. Returns the worker's final counters.
    pub async fn run<R, S>(mut self, input: R, shutdown: S) -> Result<SessionStats>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let username = self.bridge.username().to_string();
        self.presenter.banner(&username);

        let mut lines = input.lines();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }

                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if self.handle_line(&line) == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                },

                event = self.bridge.next_event() => match event {
                    Some(event) => dispatch(&mut self.presenter, event),
                    None => {
                        info!("Session worker stopped");
                        break;
                    }
                },
            }
        }

        // Keep reading events until the worker is gone so it never blocks on
        // a full queue while stopping
        self.bridge.shutdown();
        let join = self.task.join();
        tokio::pin!(join);
        let stats = loop {
            tokio::select! {
                stats = &mut join => break stats?,
                event = self.bridge.next_event() => match event {
                    Some(event) => dispatch(&mut self.presenter, event),
                    None => break (&mut join).await?,
                },
            }
        };
        self.bridge.drain(&mut self.presenter);
        info!(
            "Session ended: {} sent, {} received, {} read",
            stats.frames_sent, stats.frames_received, stats.delivery.acknowledged
        );
        Ok(stats)
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        match parse_input(line) {
            InputLine::Empty => {}
            InputLine::Quit => return Flow::Quit,
            InputLine::Help => self.presenter.show_help(),
            InputLine::Invalid(reason) => self.presenter.show_system(&reason),
            InputLine::Stats => {
                if let Err(e) = self.bridge.request_stats() {
                    return self.report_error(e);
                }
            }
            InputLine::Status(id) => {
                if let Err(e) = self.bridge.query_status(id) {
                    return self.report_error(e);
                }
            }
            InputLine::Message(text) => match self.bridge.submit(&text) {
                Ok(message) => self.presenter.show_own(&message),
                Err(e) => return self.report_error(e),
            },
        }
        Flow::Continue
    }

    fn report_error(&mut self, error: LoraChatError) -> Flow {
        match error {
            LoraChatError::Validation(e) => {
                self.presenter.show_system(&e.to_string());
                Flow::Continue
            }
            LoraChatError::Channel(ChannelError::ChannelFull) => {
                self.presenter
                    .show_system("Modem busy, message not sent. Try again shortly.");
                Flow::Continue
            }
            LoraChatError::Channel(ChannelError::ChannelClosed) => {
                self.presenter.show_system("Session closed");
                Flow::Quit
            }
            other => {
                warn!("Unexpected error: {}", other);
                self.presenter.show_system(&other.to_string());
                Flow::Continue
            }
        }
    }
}
