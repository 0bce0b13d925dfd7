//! Room codes: short human-entered identifiers, normalized to upper-case.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of characters in every room code.
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomCodeError {
    #[error("room code must be {ROOM_CODE_LEN} characters, got {0}")]
    Length(usize),
    #[error("room code contains invalid character {0:?}")]
    InvalidChar(char),
}

/// A validated, upper-cased room code.
///
/// Every entry point (client input, server lookup) goes through
/// [`RoomCode::parse`], so comparisons are case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalize and validate raw user input.
    ///
    /// # Errors
    ///
    /// Returns [`RoomCodeError`] if the trimmed input is not exactly
    /// [`ROOM_CODE_LEN`] ASCII alphanumeric characters.
    pub fn parse(raw: &str) -> Result<Self, RoomCodeError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len != ROOM_CODE_LEN {
            return Err(RoomCodeError::Length(len));
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(RoomCodeError::InvalidChar(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Generate a random code for a new room.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| char::from(ROOM_CODE_CHARSET[rng.random_range(0..ROOM_CODE_CHARSET.len())]))
            .collect();
        Self(code)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RoomCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[path = "room_code_test.rs"]
mod tests;
