use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// An opaque session identifier: 128 bits drawn from a CSPRNG, hex-rendered.
///
/// Unguessable by construction. Used as the authoritative key in the session
/// store and as the `sid` claim in capability tokens.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SessionId([u8; 16]);

impl SessionId {
    /// Draws a fresh id from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({self})")
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

/// Failure parsing a session id out of hex.
#[derive(Debug, thiserror::Error)]
pub enum SessionIdParseError {
    #[error("session id must be exactly 32 hex characters, got {0}")]
    WrongLength(usize),
    #[error("session id is not valid hex: {0}")]
    InvalidHex(String),
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(SessionIdParseError::WrongLength(s.len()));
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in bytes.iter_mut().enumerate() {
            let hi = s.as_bytes()[i * 2];
            let lo = s.as_bytes()[i * 2 + 1];
            let hi = (hi as char)
                .to_digit(16)
                .ok_or_else(|| SessionIdParseError::InvalidHex(s.to_string()))?;
            let lo = (lo as char)
                .to_digit(16)
                .ok_or_else(|| SessionIdParseError::InvalidHex(s.to_string()))?;
            *chunk = ((hi << 4) | lo) as u8;
        }
        Ok(Self(bytes))
    }
}
