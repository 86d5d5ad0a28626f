use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lesson_core::model::{HelpIndex, HintCheckpoint, HintError, HintSettings, LessonState};
use tracing::{debug, info, warn};

use super::timer::{EpochGuard, TimerHandle, TimerScheduler};
use super::{HintHandler, HintMonitor};

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// What a transition asks of the outside world once the tracker lock is released.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[must_use]
struct Effects {
    arm: Option<(Duration, u64)>,
    notify: bool,
}

impl Effects {
    fn none() -> Self {
        Self::default()
    }

    fn notify() -> Self {
        Self {
            arm: None,
            notify: true,
        }
    }

    fn with_arm(mut self, arm: Option<(Duration, u64)>) -> Self {
        self.arm = arm;
        self
    }
}

#[derive(Debug)]
struct Tracker {
    state: LessonState,
    tracked_wrong_answer_count: u32,
    help_index: HelpIndex,
    epoch: EpochGuard,
    watching: bool,
}

impl Tracker {
    fn new() -> Self {
        Self {
            state: LessonState::empty(),
            tracked_wrong_answer_count: 0,
            help_index: HelpIndex::None,
            epoch: EpochGuard::default(),
            watching: false,
        }
    }

    fn reset(
        &mut self,
        settings: &HintSettings,
        state: LessonState,
        tracked_wrong_answer_count: u32,
        help_index: HelpIndex,
    ) -> Effects {
        self.epoch.invalidate();
        self.watching = true;
        self.tracked_wrong_answer_count = tracked_wrong_answer_count;
        self.help_index = if state.offers_help() {
            help_index
        } else {
            HelpIndex::None
        };
        self.state = state;

        let arm = self.arm_follow_on(settings);
        Effects::notify().with_arm(arm)
    }

    /// Arm the timer that would normally follow the current index, if any.
    fn arm_follow_on(&mut self, settings: &HintSettings) -> Option<(Duration, u64)> {
        if !self.state.offers_help() {
            return None;
        }
        let delay = match self.help_index {
            HelpIndex::None => settings.delay_initial_hint(),
            HelpIndex::LatestRevealedHint(_) => settings.delay_additional_hint(),
            // Nothing new unlocks until the learner acts on what is already available.
            HelpIndex::NextAvailableHint(_)
            | HelpIndex::ShowSolution
            | HelpIndex::EverythingRevealed => return None,
        };
        Some(self.arm(delay))
    }

    fn arm(&mut self, delay: Duration) -> (Duration, u64) {
        let epoch = self.epoch.invalidate();
        debug!(?delay, epoch, index = %self.help_index, "armed hint timer");
        (delay, epoch)
    }

    /// Move to the next disclosure, reporting whether the index changed.
    fn reveal_next(&mut self) -> bool {
        let next = self.help_index.next_disclosure(&self.state);
        if next == self.help_index {
            return false;
        }
        debug!(from = %self.help_index, to = %next, "help became available");
        self.help_index = next;
        true
    }

    fn handle_wrong_answer(&mut self, settings: &HintSettings, wrong_answer_count: u32) -> Effects {
        if wrong_answer_count == self.tracked_wrong_answer_count {
            return Effects::none();
        }
        self.tracked_wrong_answer_count = wrong_answer_count;
        if !self.state.offers_help() || !self.watching {
            return Effects::none();
        }

        match self.help_index {
            HelpIndex::None if wrong_answer_count > 1 => {
                // Learner looks stuck: skip the wait for the first hint.
                self.epoch.invalidate();
                Effects {
                    arm: None,
                    notify: self.reveal_next(),
                }
            }
            HelpIndex::None => {
                Effects::none().with_arm(Some(self.arm(settings.delay_initial_hint())))
            }
            HelpIndex::NextAvailableHint(_) | HelpIndex::LatestRevealedHint(_) => {
                Effects::none().with_arm(Some(self.arm(settings.delay_from_wrong_answer())))
            }
            HelpIndex::ShowSolution | HelpIndex::EverythingRevealed => Effects::none(),
        }
    }

    fn view_hint(&mut self, settings: &HintSettings, hint_index: usize) -> Result<Effects, HintError> {
        if self.help_index != HelpIndex::NextAvailableHint(hint_index) {
            return Err(HintError::HintNotAvailable {
                requested: hint_index,
                current: self.help_index,
            });
        }

        self.help_index = HelpIndex::LatestRevealedHint(hint_index).settled_for(&self.state);
        let arm = if self.watching && !self.help_index.is_terminal() {
            Some(self.arm(settings.delay_additional_hint()))
        } else {
            self.epoch.invalidate();
            None
        };
        Ok(Effects::notify().with_arm(arm))
    }

    fn view_solution(&mut self) -> Result<Effects, HintError> {
        if self.help_index != HelpIndex::ShowSolution {
            return Err(HintError::SolutionNotAvailable {
                current: self.help_index,
            });
        }
        self.epoch.invalidate();
        self.help_index = HelpIndex::EverythingRevealed;
        Ok(Effects::notify())
    }

    /// Handle a timer fire. Stale epochs and paused tracking are ignored.
    fn on_timer(&mut self, epoch: u64) -> Effects {
        if !self.epoch.is_current(epoch) || !self.watching {
            debug!(epoch, current = self.epoch.current(), "dropped stale hint timer");
            return Effects::none();
        }
        Effects {
            arm: None,
            notify: self.reveal_next(),
        }
    }
}

//
// ─── HANDLER ───────────────────────────────────────────────────────────────────
//

struct Shared {
    settings: HintSettings,
    scheduler: Arc<dyn TimerScheduler>,
    monitor: Arc<dyn HintMonitor>,
    tracker: Mutex<Tracker>,
    armed: Mutex<Option<TimerHandle>>,
}

impl Shared {
    fn tracker(&self) -> MutexGuard<'_, Tracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule and notify outside the tracker lock. A new timer cancels the previous one.
    fn apply(self: &Arc<Self>, effects: Effects) {
        if let Some((delay, epoch)) = effects.arm {
            let weak = Arc::downgrade(self);
            let handle = self.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.fire(epoch);
                    }
                }),
            );
            let previous = self
                .armed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(handle);
            if let Some(previous) = previous {
                previous.cancel();
            }
        }
        if effects.notify {
            self.monitor.on_help_index_changed();
        }
    }

    fn fire(self: &Arc<Self>, epoch: u64) {
        let effects = self.tracker().on_timer(epoch);
        self.apply(effects);
    }
}

/// Timer and wrong-answer driven disclosure.
///
/// The first hint unlocks after `delay_initial_hint`, or at once on a second
/// wrong answer. Each viewed hint unlocks the next item after
/// `delay_additional_hint`, and a wrong answer once help has started restarts
/// that wait at `delay_from_wrong_answer`. Hints unlock strictly in order; the
/// solution follows the last hint.
pub struct ProdHintHandler {
    shared: Arc<Shared>,
}

impl ProdHintHandler {
    #[must_use]
    pub fn new(
        settings: HintSettings,
        scheduler: Arc<dyn TimerScheduler>,
        monitor: Arc<dyn HintMonitor>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                scheduler,
                monitor,
                tracker: Mutex::new(Tracker::new()),
                armed: Mutex::new(None),
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Tracker, &HintSettings) -> Effects) {
        let effects = f(&mut self.shared.tracker(), &self.shared.settings);
        self.shared.apply(effects);
    }

    fn try_update(
        &self,
        f: impl FnOnce(&mut Tracker, &HintSettings) -> Result<Effects, HintError>,
    ) -> Result<(), HintError> {
        let result = f(&mut self.shared.tracker(), &self.shared.settings);
        match result {
            Ok(effects) => {
                self.shared.apply(effects);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "rejected reveal request");
                Err(err)
            }
        }
    }
}

impl HintHandler for ProdHintHandler {
    fn start_watching_for_hints_in_new_state(&self, state: LessonState) {
        debug!(state = %state.name(), "watching for hints");
        self.update(|tracker, settings| tracker.reset(settings, state, 0, HelpIndex::None));
    }

    fn resume_hints_for_saved_state(
        &self,
        tracked_wrong_answer_count: u32,
        help_index: HelpIndex,
        state: LessonState,
    ) {
        let help_index = if help_index.is_consistent_with(&state) {
            help_index.settled_for(&state)
        } else {
            warn!(
                state = %state.name(),
                index = %help_index,
                "saved help index does not fit state; starting over"
            );
            HelpIndex::None
        };
        info!(
            state = %state.name(),
            index = %help_index,
            tracked_wrong_answer_count,
            "resuming hints from checkpoint"
        );
        self.update(|tracker, settings| {
            tracker.reset(settings, state, tracked_wrong_answer_count, help_index)
        });
    }

    fn finish_state(&self, next_state: LessonState) {
        debug!(next = %next_state.name(), "finished pending state");
        self.update(|tracker, settings| tracker.reset(settings, next_state, 0, HelpIndex::None));
    }

    fn handle_wrong_answer_submission(&self, wrong_answer_count: u32) {
        self.update(|tracker, settings| tracker.handle_wrong_answer(settings, wrong_answer_count));
    }

    fn view_hint(&self, hint_index: usize) -> Result<(), HintError> {
        self.try_update(|tracker, settings| tracker.view_hint(settings, hint_index))
    }

    fn view_solution(&self) -> Result<(), HintError> {
        self.try_update(|tracker, _| tracker.view_solution())
    }

    fn navigate_to_previous_state(&self) {
        self.update(|tracker, _| {
            tracker.epoch.invalidate();
            tracker.watching = false;
            Effects::none()
        });
    }

    fn navigate_back_to_latest_pending_state(&self) {
        self.update(|tracker, settings| {
            tracker.watching = true;
            let arm = tracker.arm_follow_on(settings);
            Effects::none().with_arm(arm)
        });
    }

    fn current_help_index(&self) -> HelpIndex {
        self.shared.tracker().help_index
    }

    fn checkpoint(&self) -> HintCheckpoint {
        let tracker = self.shared.tracker();
        HintCheckpoint::new(tracker.tracked_wrong_answer_count, tracker.help_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::timer::ManualScheduler;
    use lesson_core::model::LessonStateDraft;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn state(hints: usize, with_solution: bool) -> LessonState {
        let mut draft = LessonStateDraft::new("Question");
        for i in 0..hints {
            draft = draft.with_hint(format!("hint {i}"));
        }
        if with_solution {
            draft = draft.with_solution("explanation", "answer");
        }
        draft.validate().unwrap()
    }

    struct Harness {
        scheduler: ManualScheduler,
        calls: Arc<AtomicUsize>,
        handler: ProdHintHandler,
    }

    impl Harness {
        fn new() -> Self {
            let scheduler = ManualScheduler::new();
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let handler = ProdHintHandler::new(
                HintSettings::default(),
                Arc::new(scheduler.clone()),
                Arc::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
            Self {
                scheduler,
                calls,
                handler,
            }
        }

        fn wait(&self, n: u64) {
            self.scheduler.advance(secs(n));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn index(&self) -> HelpIndex {
            self.handler.current_help_index()
        }
    }

    #[test]
    fn new_state_notifies_once_and_waits_for_initial_delay() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(2, true));
        assert_eq!(h.calls(), 1);
        assert_eq!(h.index(), HelpIndex::None);

        h.wait(10);
        assert_eq!(h.calls(), 1);
        h.wait(20);
        assert_eq!(h.index(), HelpIndex::None);
        h.wait(30);
        assert_eq!(h.calls(), 2);
        assert_eq!(h.index(), HelpIndex::NextAvailableHint(0));
    }

    #[test]
    fn available_hint_does_not_advance_on_its_own() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(2, true));
        h.wait(60);
        h.wait(600);
        assert_eq!(h.index(), HelpIndex::NextAvailableHint(0));
        assert_eq!(h.calls(), 2);
    }

    #[test]
    fn first_wrong_answer_restarts_initial_wait() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(1, false));
        h.wait(50);
        h.handler.handle_wrong_answer_submission(1);
        h.wait(30);
        assert_eq!(h.index(), HelpIndex::None);
        h.wait(30);
        assert_eq!(h.index(), HelpIndex::NextAvailableHint(0));
    }

    #[test]
    fn duplicate_wrong_answer_count_is_ignored() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(1, false));
        h.wait(50);
        h.handler.handle_wrong_answer_submission(0);
        h.wait(10);
        assert_eq!(h.index(), HelpIndex::NextAvailableHint(0));
    }

    #[test]
    fn wrong_answer_after_hint_uses_wrong_answer_delay() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(2, false));
        h.wait(60);
        h.handler.view_hint(0).unwrap();
        h.handler.handle_wrong_answer_submission(1);
        h.wait(9);
        assert_eq!(h.index(), HelpIndex::LatestRevealedHint(0));
        h.wait(1);
        assert_eq!(h.index(), HelpIndex::NextAvailableHint(1));
    }

    #[test]
    fn viewing_last_hint_without_solution_reveals_everything() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(1, false));
        h.wait(60);
        h.handler.view_hint(0).unwrap();
        assert_eq!(h.index(), HelpIndex::EverythingRevealed);
        assert_eq!(h.calls(), 3);
        assert_eq!(h.scheduler.pending_count(), 0);
    }

    #[test]
    fn view_hint_rejects_wrong_index() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(2, true));
        assert_eq!(
            h.handler.view_hint(0),
            Err(HintError::HintNotAvailable {
                requested: 0,
                current: HelpIndex::None
            })
        );
        h.wait(60);
        assert!(h.handler.view_hint(1).is_err());
        h.handler.view_hint(0).unwrap();
        assert!(h.handler.view_hint(0).is_err());
        assert_eq!(h.index(), HelpIndex::LatestRevealedHint(0));
    }

    #[test]
    fn view_solution_requires_unlocked_solution() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(0, true));
        assert_eq!(
            h.handler.view_solution(),
            Err(HintError::SolutionNotAvailable {
                current: HelpIndex::None
            })
        );
        h.wait(60);
        assert_eq!(h.index(), HelpIndex::ShowSolution);
        h.handler.view_solution().unwrap();
        assert_eq!(h.index(), HelpIndex::EverythingRevealed);
        assert!(h.handler.view_solution().is_err());
    }

    #[test]
    fn wrong_answers_while_paused_only_update_the_count() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(2, false));
        h.handler.navigate_to_previous_state();
        h.handler.handle_wrong_answer_submission(1);
        h.handler.handle_wrong_answer_submission(2);
        h.wait(120);
        assert_eq!(h.index(), HelpIndex::None);
        assert_eq!(h.calls(), 1);
        assert_eq!(h.handler.checkpoint().tracked_wrong_answer_count, 2);
    }

    #[test]
    fn dropped_handler_ignores_pending_timer() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(1, false));
        let Harness {
            scheduler,
            calls,
            handler,
        } = h;
        drop(handler);
        assert_eq!(scheduler.advance(secs(60)), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rearming_cancels_the_previous_timer() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(2, false));
        assert_eq!(h.scheduler.pending_count(), 1);
        h.handler.handle_wrong_answer_submission(1);
        assert_eq!(h.scheduler.pending_count(), 1);

        h.wait(60);
        h.handler.view_hint(0).unwrap();
        h.handler.handle_wrong_answer_submission(2);
        h.handler.handle_wrong_answer_submission(3);
        assert_eq!(h.scheduler.pending_count(), 1);
        assert_eq!(h.scheduler.advance(secs(60)), 1);
        assert_eq!(h.index(), HelpIndex::NextAvailableHint(1));
    }

    #[test]
    fn checkpoint_reports_count_and_index() {
        let h = Harness::new();
        h.handler.start_watching_for_hints_in_new_state(state(2, false));
        h.handler.handle_wrong_answer_submission(1);
        h.handler.handle_wrong_answer_submission(2);
        assert_eq!(
            h.handler.checkpoint(),
            HintCheckpoint::new(2, HelpIndex::NextAvailableHint(0))
        );
    }
}
