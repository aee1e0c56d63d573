//! LoRa chat CLI entry point

use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lorachat_cli::{
    app::ChatApp, cli::Cli, config::AppConfig, error::Result, terminal::TerminalPresenter,
};
use lorachat_core::Username;
use lorachat_runtime::{SerialTransport, SessionBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let username = match Username::parse(&cli.username) {
        Ok(username) => username,
        Err(e) => {
            eprintln!("Invalid username: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = load_configuration(&cli)?;
    config.apply_overrides(cli.port.clone(), cli.baud);
    config.validate()?;

    let transport = match SerialTransport::open(&config.serial, config.channels.inbound_buffer_size)
    {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to open modem: {}", e);
            std::process::exit(1);
        }
    };
    info!("Connected to {}", transport.port_name());

    let (bridge, task) = SessionBuilder::new(username)
        .with_protocol(config.protocol.clone())
        .with_channels(config.channels.clone())
        .build_and_start(transport)?;

    let app = ChatApp::new(bridge, task, TerminalPresenter::new(std::io::stdout()));
    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    app.run(input, shutdown).await?;
    info!("LoRa chat exited");
    Ok(())
}

/// Logs go to stderr so they do not interleave with the chat on stdout.
/// `RUST_LOG` takes precedence over `--verbose`.
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path);
        AppConfig::load_from_file(config_path)
    } else {
        info!("Using default configuration");
        Ok(AppConfig::default())
    }
}
