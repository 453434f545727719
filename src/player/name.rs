//! Player identifiers
//!
//! Names are accepted from untrusted network input and end up as file names
//! in the world directory and as a line in the persisted player record, so
//! they are validated once at construction and never change afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Historical buffer size of a player name, including the terminator slot
pub const PLAYERNAME_SIZE: usize = 20;

/// Characters a player name may consist of
pub const PLAYERNAME_ALLOWED_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Validated player name: 1..20 characters from `[A-Za-z0-9_-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    /// Validate `raw` and wrap it.
    ///
    /// Oversized names are rejected rather than truncated; a truncated name
    /// would silently alias another player's record.
    pub fn new(raw: impl Into<String>) -> Result<Self, PlayerNameError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(PlayerNameError::Empty);
        }
        if let Some(bad) = raw.chars().find(|c| !Self::is_allowed_char(*c)) {
            return Err(PlayerNameError::InvalidChar(bad));
        }
        // All allowed characters are ASCII, so bytes == chars here
        if raw.len() >= PLAYERNAME_SIZE {
            return Err(PlayerNameError::TooLong { len: raw.len() });
        }

        Ok(Self(raw))
    }

    pub fn is_allowed_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlayerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerName {
    type Error = PlayerNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PlayerName {
    type Error = PlayerNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerName> for String {
    fn from(name: PlayerName) -> Self {
        name.0
    }
}

/// Player name validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerNameError {
    #[error("Player name is empty")]
    Empty,

    #[error("Player name is {len} characters long, the limit is {}", PLAYERNAME_SIZE - 1)]
    TooLong { len: usize },

    #[error("Player name contains disallowed character {0:?}")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_names() {
        for raw in ["singleplayer", "a", "Player_01", "x-y-z", "abcdefghijklmnopqrs"] {
            let name = PlayerName::new(raw).unwrap();
            assert_eq!(name.as_str(), raw);
        }
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(PlayerName::new(""), Err(PlayerNameError::Empty));
    }

    #[test]
    fn rejects_names_at_capacity() {
        let raw = "a".repeat(PLAYERNAME_SIZE);
        assert_eq!(
            PlayerName::new(raw),
            Err(PlayerNameError::TooLong { len: PLAYERNAME_SIZE })
        );
    }

    #[test]
    fn rejects_characters_outside_the_set() {
        assert_eq!(
            PlayerName::new("bad name"),
            Err(PlayerNameError::InvalidChar(' '))
        );
        assert_eq!(
            PlayerName::new("evil\nPlayerArgsEnd"),
            Err(PlayerNameError::InvalidChar('\n'))
        );
        assert_eq!(PlayerName::new("nul\0"), Err(PlayerNameError::InvalidChar('\0')));
        assert_eq!(PlayerName::new("ünicode"), Err(PlayerNameError::InvalidChar('ü')));
    }

    #[test]
    fn allowed_chars_constant_matches_predicate() {
        assert!(PLAYERNAME_ALLOWED_CHARS.chars().all(PlayerName::is_allowed_char));
        assert_eq!(PLAYERNAME_ALLOWED_CHARS.len(), 64);
    }

    #[test]
    fn serde_goes_through_validation() {
        let name: PlayerName = serde_json::from_str("\"celeron55\"").unwrap();
        assert_eq!(name.as_str(), "celeron55");
        assert!(serde_json::from_str::<PlayerName>("\"no spaces\"").is_err());
    }
}
