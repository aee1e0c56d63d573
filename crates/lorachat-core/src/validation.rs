//! Input validation at the session boundary
//!
//! Nothing reaches the codec without passing through here.

use std::fmt;

use crate::errors::ValidationError;
use crate::framing::{FRAME_CLOSE, FRAME_OPEN};

pub const USERNAME_MIN_CHARS: usize = 2;
pub const USERNAME_MAX_CHARS: usize = 20;

/// A username that has passed length validation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Validate a username; length is counted in characters, not bytes
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let name = raw.trim();
        let len = name.chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
            return Err(ValidationError::UsernameLength {
                len,
                min: USERNAME_MIN_CHARS,
                max: USERNAME_MAX_CHARS,
            });
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trim user input and check it fits in one frame
///
/// The codec does not escape `/`, so content carrying a frame tag would
/// split the modem line. Returns the trimmed content on success.
pub fn validate_content(content: &str, max_bytes: usize) -> Result<&str, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if trimmed.len() > max_bytes {
        return Err(ValidationError::ContentTooLong {
            len: trimmed.len(),
            max: max_bytes,
        });
    }
    if let Some(marker) = [FRAME_OPEN, FRAME_CLOSE]
        .into_iter()
        .find(|marker| trimmed.contains(marker))
    {
        return Err(ValidationError::FrameMarker { marker });
    }
    Ok(trimmed)
}
