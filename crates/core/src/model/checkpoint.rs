use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::help_index::HelpIndex;
use crate::model::ids::PlaythroughId;

/// Hint progress needed to resume a lesson state after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HintCheckpoint {
    pub tracked_wrong_answer_count: u32,
    pub help_index: HelpIndex,
}

impl HintCheckpoint {
    #[must_use]
    pub fn new(tracked_wrong_answer_count: u32, help_index: HelpIndex) -> Self {
        Self {
            tracked_wrong_answer_count,
            help_index,
        }
    }
}

/// A checkpoint as persisted for a play-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCheckpoint {
    pub playthrough: PlaythroughId,
    pub checkpoint: HintCheckpoint,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn saved_checkpoint_survives_json() {
        let saved = SavedCheckpoint {
            playthrough: PlaythroughId::new(7),
            checkpoint: HintCheckpoint::new(2, HelpIndex::LatestRevealedHint(0)),
            saved_at: fixed_now(),
        };
        let json = serde_json::to_string(&saved).unwrap();
        let back: SavedCheckpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, saved);
    }
}
