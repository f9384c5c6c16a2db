use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::BoardError;

/// A column of the board. The set is closed; every card lives in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Todo,
    Doing,
    Done,
}

impl Lane {
    /// All lanes, in board order.
    pub const ALL: [Lane; 3] = [Lane::Todo, Lane::Doing, Lane::Done];

    /// Returns the identifier stored in the database and sent over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    /// Parses an optional lane hint. Absent or blank hints fall back to the
    /// first lane.
    pub fn from_hint(hint: Option<&str>) -> Result<Self, BoardError> {
        match hint.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => value.parse(),
        }
    }
}

impl Default for Lane {
    fn default() -> Self {
        Self::ALL[0]
    }
}

impl FromStr for Lane {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "todo" => Ok(Self::Todo),
            "doing" => Ok(Self::Doing),
            "done" => Ok(Self::Done),
            _ => Err(BoardError::validation("Invalid lane.")),
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
