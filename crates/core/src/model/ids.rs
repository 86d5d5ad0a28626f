use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a single play-through of a lesson.
///
/// One hint handler lives for the duration of a play-through, and checkpoints
/// are keyed by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaythroughId(u64);

impl PlaythroughId {
    /// Creates a new `PlaythroughId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PlaythroughId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaythroughId({})", self.0)
    }
}

impl fmt::Display for PlaythroughId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing an id from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid play-through id: {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for PlaythroughId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self::new)
            .map_err(|_| ParseIdError { raw: s.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_playthrough_id() {
        let id: PlaythroughId = " 42 ".parse().unwrap();
        assert_eq!(id, PlaythroughId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "PlaythroughId(42)");
    }

    #[test]
    fn rejects_non_numeric_id() {
        let err = "abc".parse::<PlaythroughId>().unwrap_err();
        assert!(err.to_string().contains("abc"));
    }
}
