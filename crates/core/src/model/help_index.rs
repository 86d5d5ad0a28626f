use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::lesson::{Hint, LessonState};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Caller attempted to reveal help that is not currently pending.
///
/// These indicate a UI bug: reveal actions should only be offered when
/// `HelpIndex` says something is available.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HintError {
    #[error("cannot reveal hint {requested} for current index {current}")]
    HintNotAvailable { requested: usize, current: HelpIndex },

    #[error("cannot reveal solution for current index {current}")]
    SolutionNotAvailable { current: HelpIndex },
}

//
// ─── HELP INDEX ────────────────────────────────────────────────────────────────
//

/// Disclosure position for the current lesson state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum HelpIndex {
    /// Nothing unlocked yet.
    #[default]
    None,
    /// Hint `index` is unlocked but not viewed.
    NextAvailableHint(usize),
    /// Hints `0..=index` have been viewed.
    LatestRevealedHint(usize),
    /// Every hint viewed; the solution is unlocked but not viewed.
    ShowSolution,
    /// Nothing left to disclose.
    EverythingRevealed,
}

impl HelpIndex {
    /// `ShowSolution` and `EverythingRevealed` can only move forward through a learner action.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, HelpIndex::ShowSolution | HelpIndex::EverythingRevealed)
    }

    #[must_use]
    pub fn is_solution_available(self) -> bool {
        matches!(self, HelpIndex::ShowSolution)
    }

    #[must_use]
    pub fn is_solution_revealed(self, state: &LessonState) -> bool {
        state.has_solution() && matches!(self, HelpIndex::EverythingRevealed)
    }

    /// Whether the hint at `hint_index` has already been viewed under this index.
    #[must_use]
    pub fn is_hint_revealed(self, hint_index: usize, hints: &[Hint]) -> bool {
        match self {
            HelpIndex::None => false,
            HelpIndex::NextAvailableHint(next) => hint_index < next,
            HelpIndex::LatestRevealedHint(latest) => hint_index <= latest,
            HelpIndex::ShowSolution | HelpIndex::EverythingRevealed => hint_index < hints.len(),
        }
    }

    /// The hints the learner can currently see, dropping those not yet unlocked.
    #[must_use]
    pub fn visible_hints(self, hints: &[Hint]) -> &[Hint] {
        let visible = match self {
            HelpIndex::None => 0,
            HelpIndex::NextAvailableHint(index) | HelpIndex::LatestRevealedHint(index) => {
                index.saturating_add(1)
            }
            HelpIndex::ShowSolution | HelpIndex::EverythingRevealed => hints.len(),
        };
        &hints[..visible.min(hints.len())]
    }

    /// The next item that may become available for `state`, given that this
    /// index describes what has been disclosed so far.
    ///
    /// The lowest hint not yet viewed comes first, then an unviewed solution,
    /// otherwise everything has been revealed. An already-unlocked hint maps
    /// to itself.
    #[must_use]
    pub fn next_disclosure(self, state: &LessonState) -> HelpIndex {
        let first_unrevealed = match self {
            HelpIndex::None => 0,
            HelpIndex::NextAvailableHint(index) => index,
            HelpIndex::LatestRevealedHint(index) => index.saturating_add(1),
            HelpIndex::ShowSolution => return HelpIndex::ShowSolution,
            HelpIndex::EverythingRevealed => return HelpIndex::EverythingRevealed,
        };

        if first_unrevealed < state.hints().len() {
            HelpIndex::NextAvailableHint(first_unrevealed)
        } else if state.has_solution() {
            HelpIndex::ShowSolution
        } else {
            HelpIndex::EverythingRevealed
        }
    }

    /// Collapse an index that has nothing left to follow it in `state`.
    ///
    /// Having viewed the last hint of a state without a solution means
    /// everything is revealed.
    #[must_use]
    pub fn settled_for(self, state: &LessonState) -> HelpIndex {
        match self {
            HelpIndex::LatestRevealedHint(index)
                if !state.has_solution() && state.last_hint_index() == Some(index) =>
            {
                HelpIndex::EverythingRevealed
            }
            other => other,
        }
    }

    /// Whether this index could have been produced while tracking `state`.
    #[must_use]
    pub fn is_consistent_with(self, state: &LessonState) -> bool {
        if !state.offers_help() {
            return self == HelpIndex::None;
        }
        match self {
            HelpIndex::None | HelpIndex::EverythingRevealed => true,
            HelpIndex::NextAvailableHint(index) | HelpIndex::LatestRevealedHint(index) => {
                index < state.hints().len()
            }
            HelpIndex::ShowSolution => state.has_solution(),
        }
    }
}

impl fmt::Display for HelpIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelpIndex::None => f.write_str("none"),
            HelpIndex::NextAvailableHint(i) => write!(f, "next_available_hint({i})"),
            HelpIndex::LatestRevealedHint(i) => write!(f, "latest_revealed_hint({i})"),
            HelpIndex::ShowSolution => f.write_str("show_solution"),
            HelpIndex::EverythingRevealed => f.write_str("everything_revealed"),
        }
    }
}
