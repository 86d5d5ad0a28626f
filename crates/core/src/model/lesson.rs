use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonStateError {
    #[error("state name cannot be empty")]
    EmptyName,

    #[error("hint {index} has no content")]
    EmptyHint { index: usize },
}

//
// ─── HELP CONTENT ──────────────────────────────────────────────────────────────
//

/// A single hint attached to a lesson state.
///
/// `is_revealed` mirrors what the lesson engine recorded; the hint handler
/// tracks disclosure on its own and never writes this flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub content: String,
    #[serde(default)]
    pub is_revealed: bool,
}

impl Hint {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_revealed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub explanation: String,
    pub correct_answer: String,
    #[serde(default)]
    pub is_revealed: bool,
}

impl Solution {
    #[must_use]
    pub fn new(explanation: impl Into<String>, correct_answer: impl Into<String>) -> Self {
        Self {
            explanation: explanation.into(),
            correct_answer: correct_answer.into(),
            is_revealed: false,
        }
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Name of a lesson state, unique within its lesson.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct StateName(String);

impl StateName {
    /// Validate and normalize a state name.
    ///
    /// # Errors
    ///
    /// Returns `LessonStateError::EmptyName` if the trimmed name is empty.
    pub fn parse(name: impl Into<String>) -> Result<Self, LessonStateError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LessonStateError::EmptyName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateName({:?})", self.0)
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of the help attached to one lesson state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LessonState {
    name: StateName,
    hints: Vec<Hint>,
    solution: Option<Solution>,
}

impl LessonState {
    /// A state with nothing to disclose, used between questions.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(&self) -> &StateName {
        &self.name
    }

    #[must_use]
    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    #[must_use]
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    #[must_use]
    pub fn has_solution(&self) -> bool {
        self.solution.is_some()
    }

    /// Whether this state has any hint or solution the learner could see.
    #[must_use]
    pub fn offers_help(&self) -> bool {
        !self.hints.is_empty() || self.has_solution()
    }

    /// Index of the final hint, if any.
    #[must_use]
    pub fn last_hint_index(&self) -> Option<usize> {
        self.hints.len().checked_sub(1)
    }
}

/// Unvalidated lesson state as handed over by the lesson engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LessonStateDraft {
    pub name: String,
    #[serde(default)]
    pub hints: Vec<Hint>,
    #[serde(default)]
    pub solution: Option<Solution>,
}

impl LessonStateDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_hint(mut self, content: impl Into<String>) -> Self {
        self.hints.push(Hint::new(content));
        self
    }

    #[must_use]
    pub fn with_solution(
        mut self,
        explanation: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        self.solution = Some(Solution::new(explanation, correct_answer));
        self
    }

    /// Validate the draft into an immutable `LessonState`.
    ///
    /// # Errors
    ///
    /// Returns `LessonStateError` if the name is empty or a hint has no content.
    pub fn validate(self) -> Result<LessonState, LessonStateError> {
        let name = StateName::parse(self.name)?;
        if let Some(index) = self.hints.iter().position(|h| h.content.trim().is_empty()) {
            return Err(LessonStateError::EmptyHint { index });
        }
        Ok(LessonState {
            name,
            hints: self.hints,
            solution: self.solution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_offers_no_help() {
        let state = LessonState::empty();
        assert!(!state.offers_help());
        assert_eq!(state.last_hint_index(), None);
    }

    #[test]
    fn solution_only_state_offers_help() {
        let state = LessonStateDraft::new("Fractions")
            .with_solution("Halve both sides", "1/2")
            .validate()
            .unwrap();
        assert!(state.offers_help());
        assert!(state.hints().is_empty());
    }

    #[test]
    fn validate_trims_name_and_rejects_blank_hints() {
        let state = LessonStateDraft::new("  Intro ")
            .with_hint("Look at the numerator")
            .validate()
            .unwrap();
        assert_eq!(state.name().as_str(), "Intro");
        assert_eq!(state.last_hint_index(), Some(0));

        let err = LessonStateDraft::new("Intro")
            .with_hint("first")
            .with_hint("   ")
            .validate()
            .unwrap_err();
        assert_eq!(err, LessonStateError::EmptyHint { index: 1 });

        assert_eq!(
            LessonStateDraft::new(" ").validate().unwrap_err(),
            LessonStateError::EmptyName
        );
    }
}
