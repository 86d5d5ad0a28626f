use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lesson_core::model::{HelpIndex, HintCheckpoint, HintError, LessonState};
use tracing::debug;

use super::{HintHandler, HintMonitor};

#[derive(Debug, Default)]
struct Disclosure {
    help_index: HelpIndex,
    tracked_wrong_answer_count: u32,
}

/// Shows all help for every state as soon as it is entered.
///
/// Used for manual QA builds. No timer is ever armed, so the scheduler is not needed.
pub struct RevealAllHintHandler {
    monitor: Arc<dyn HintMonitor>,
    disclosure: Mutex<Disclosure>,
}

impl RevealAllHintHandler {
    #[must_use]
    pub fn new(monitor: Arc<dyn HintMonitor>) -> Self {
        Self {
            monitor,
            disclosure: Mutex::new(Disclosure::default()),
        }
    }

    fn disclosure(&self) -> MutexGuard<'_, Disclosure> {
        self.disclosure.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reveal(&self, state: &LessonState, tracked_wrong_answer_count: u32) {
        let help_index = if state.offers_help() {
            HelpIndex::EverythingRevealed
        } else {
            HelpIndex::None
        };
        debug!(state = %state.name(), index = %help_index, "revealing all help");
        {
            let mut disclosure = self.disclosure();
            disclosure.help_index = help_index;
            disclosure.tracked_wrong_answer_count = tracked_wrong_answer_count;
        }
        self.monitor.on_help_index_changed();
    }
}

impl HintHandler for RevealAllHintHandler {
    fn start_watching_for_hints_in_new_state(&self, state: LessonState) {
        self.reveal(&state, 0);
    }

    fn resume_hints_for_saved_state(
        &self,
        tracked_wrong_answer_count: u32,
        _help_index: HelpIndex,
        state: LessonState,
    ) {
        self.reveal(&state, tracked_wrong_answer_count);
    }

    fn finish_state(&self, next_state: LessonState) {
        self.reveal(&next_state, 0);
    }

    fn handle_wrong_answer_submission(&self, wrong_answer_count: u32) {
        self.disclosure().tracked_wrong_answer_count = wrong_answer_count;
    }

    fn view_hint(&self, hint_index: usize) -> Result<(), HintError> {
        Err(HintError::HintNotAvailable {
            requested: hint_index,
            current: self.current_help_index(),
        })
    }

    fn view_solution(&self) -> Result<(), HintError> {
        Err(HintError::SolutionNotAvailable {
            current: self.current_help_index(),
        })
    }

    fn navigate_to_previous_state(&self) {}

    fn navigate_back_to_latest_pending_state(&self) {}

    fn current_help_index(&self) -> HelpIndex {
        self.disclosure().help_index
    }

    fn checkpoint(&self) -> HintCheckpoint {
        let disclosure = self.disclosure();
        HintCheckpoint::new(disclosure.tracked_wrong_answer_count, disclosure.help_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::LessonStateDraft;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handler() -> (RevealAllHintHandler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = RevealAllHintHandler::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (handler, calls)
    }

    fn state_with_help() -> LessonState {
        LessonStateDraft::new("Q")
            .with_hint("first")
            .with_solution("why", "42")
            .validate()
            .unwrap()
    }

    #[test]
    fn state_with_help_is_fully_revealed_at_once() {
        let (handler, calls) = handler();
        handler.start_watching_for_hints_in_new_state(state_with_help());
        assert_eq!(handler.current_help_index(), HelpIndex::EverythingRevealed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_without_help_stays_empty() {
        let (handler, calls) = handler();
        handler.finish_state(LessonState::empty());
        assert_eq!(handler.current_help_index(), HelpIndex::None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resume_ignores_saved_index() {
        let (handler, calls) = handler();
        handler.resume_hints_for_saved_state(3, HelpIndex::NextAvailableHint(0), state_with_help());
        assert_eq!(
            handler.checkpoint(),
            HintCheckpoint::new(3, HelpIndex::EverythingRevealed)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn learner_events_never_notify() {
        let (handler, calls) = handler();
        handler.start_watching_for_hints_in_new_state(state_with_help());
        handler.handle_wrong_answer_submission(1);
        handler.handle_wrong_answer_submission(2);
        handler.navigate_to_previous_state();
        handler.navigate_back_to_latest_pending_state();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handler.view_hint(0).is_err());
        assert!(handler.view_solution().is_err());
        assert_eq!(handler.checkpoint().tracked_wrong_answer_count, 2);
    }
}
