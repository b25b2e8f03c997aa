//! Board identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier naming a logical collection of logs.
///
/// The landscape never looks inside a board; it only compares identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    /// Wrap a board name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the board name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BoardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BoardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_id_serializes_as_plain_string() {
        let board = BoardId::from("P1");
        assert_eq!(serde_json::to_string(&board).unwrap(), "\"P1\"");

        let back: BoardId = serde_json::from_str("\"P1\"").unwrap();
        assert_eq!(back, board);
    }
}
