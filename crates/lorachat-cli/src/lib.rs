//! LoRa chat terminal client
//!
//! Library half of the `lorachat` binary so the interactive loop can be
//! driven from tests with in-memory input and output.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod terminal;

pub use app::ChatApp;
pub use config::AppConfig;
pub use error::{CliError, Result};
pub use terminal::{TerminalPresenter, TimeDisplay};
