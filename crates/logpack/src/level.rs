//! Log level for filtering messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity ranking of a log call.
///
/// Levels form a total order: `Debug < Info < Warning < Error < Silent`.
/// A writer configured with a threshold delivers a message only when the
/// message level is at or above that threshold; `Silent` therefore suppresses
/// everything, since no message can be logged at or above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    /// Debug level (most verbose).
    Debug = 1,
    /// Info level (default).
    Info = 2,
    /// Warning level.
    Warning = 3,
    /// Error level. Messages at this level force-flush their buffer.
    Error = 4,
    /// Suppresses all output.
    Silent = 5,
}

impl Level {
    /// Returns the canonical lowercase display name of the level.
    ///
    /// The name doubles as the console-method lookup key, so levels without a
    /// console counterpart map to the generic fallback `"log"`.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
            Self::Silent => "log",
        }
    }

    /// Returns the numeric ordinal of the level.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Converts a numeric ordinal back to a level.
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(Self::Debug),
            2 => Some(Self::Info),
            3 => Some(Self::Warning),
            4 => Some(Self::Error),
            5 => Some(Self::Silent),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "silent" => Ok(Self::Silent),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid log level string.
///
/// Accepted strings (case-insensitive): `"debug"`, `"info"`, `"warn"`,
/// `"warning"`, `"error"`, `"silent"`.
#[derive(Error, Debug, Clone)]
#[error("invalid level: {0:?}")]
pub struct ParseLevelError(String);

/// A specialized [`Result`] type for level parsing operations.
pub type ParseResult<T> = std::result::Result<T, ParseLevelError>;
