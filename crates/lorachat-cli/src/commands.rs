//! Parsing of lines typed at the chat prompt

use lorachat_core::MessageId;

/// What a line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    /// Plain text to send as a chat message
    Message(String),
    Quit,
    Status(MessageId),
    Stats,
    Help,
    /// A slash command that could not be understood
    Invalid(String),
    Empty,
}

pub const HELP_TEXT: &str = "\
Commands:
  /status <id>   show delivery status of one of your messages
  /stats         show session counters
  /help          show this help
  /quit          leave the chat
Anything else is sent as a message.";

pub fn parse_input(line: &str) -> InputLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputLine::Empty;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return InputLine::Message(trimmed.to_string());
    };

    let mut parts = rest.split_whitespace();
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next();

    match (command.as_str(), argument) {
        ("quit" | "exit" | "q", _) => InputLine::Quit,
        ("help" | "h" | "?", _) => InputLine::Help,
        ("stats", _) => InputLine::Stats,
        ("status", Some(id)) => InputLine::Status(MessageId::from(id.trim_start_matches('#'))),
        ("status", None) => InputLine::Invalid("usage: /status <id>".to_string()),
        _ => InputLine::Invalid(format!("unknown command /{}, try /help", command)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse_input("  hello there \n"),
            InputLine::Message("hello there".to_string())
        );
        assert_eq!(parse_input("   "), InputLine::Empty);
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(parse_input("/quit"), InputLine::Quit);
        assert_eq!(parse_input("/QUIT"), InputLine::Quit);
        assert_eq!(parse_input("/help"), InputLine::Help);
        assert_eq!(parse_input("/stats"), InputLine::Stats);
        assert_eq!(
            parse_input("/status #a1b2c3d4"),
            InputLine::Status(MessageId::from("a1b2c3d4"))
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(parse_input("/status"), InputLine::Invalid(_)));
        assert!(matches!(parse_input("/frobnicate"), InputLine::Invalid(_)));
        assert!(matches!(parse_input("/"), InputLine::Invalid(_)));
    }
}
