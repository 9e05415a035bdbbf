//! Usernames carried by login lines.

use std::borrow::Borrow;
use std::fmt;

use crate::error::ProtocolError;

/// A username taken from a login line.
///
/// Any line the framing can deliver is a username, the empty line included.
/// Uniqueness among connected users is the only rule, and the server
/// enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    /// Wraps a received login line.
    pub fn from_line(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    /// Checks that a name can be sent as a login line.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidUsername` if the name contains a line
    /// feed or ends with a carriage return, since neither survives framing.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if raw.contains('\n') {
            return Err(ProtocolError::InvalidUsername(
                "must not contain a line break".to_string(),
            ));
        }
        if raw.ends_with('\r') {
            return Err(ProtocolError::InvalidUsername(
                "must not end with a carriage return".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the username as a string slice.
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

impl Borrow<str> for Username {
    fn borrow(&self) -> &str {
        &self.0
    }
}
