//! Channel Module
//!
//! CSP channel infrastructure between the presentation context and the
//! session worker:
//! - `communication`: commands, app events and their payload types
//! - `utils`: channel constructors and the non-blocking send helper

pub mod communication;
pub mod utils;

pub use communication::{AppEvent, Command, LinkStatus, Notice, NoticeLevel, SessionStats};

pub use crate::config::ChannelConfig;
pub use crate::errors::ChannelError;

pub use utils::{
    create_app_event_channel, create_command_channel, create_shutdown_signal, AppEventReceiver,
    AppEventSender, CommandReceiver, CommandSender, NonBlockingSend, ShutdownReceiver,
    ShutdownSender,
};
