//! Command-line interface definitions and parsing

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat over a LoRa serial modem", long_about = None)]
pub struct Cli {
    /// Your display name (2-20 characters)
    pub username: String,

    /// Serial port of the modem; auto-detected when omitted
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["lorachat", "alice", "/dev/ttyACM0", "--baud", "9600"])
            .unwrap();
        assert_eq!(cli.username, "alice");
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cli.baud, Some(9600));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_port_is_optional() {
        let cli = Cli::try_parse_from(["lorachat", "bob", "-v"]).unwrap();
        assert_eq!(cli.port, None);
        assert!(cli.verbose);
    }

    #[test]
    fn test_username_is_required() {
        assert!(Cli::try_parse_from(["lorachat"]).is_err());
    }
}
