mod factory;
mod prod;
mod reveal_all;
mod session;
pub mod timer;

use lesson_core::model::{HelpIndex, HintCheckpoint, HintError, LessonState};

pub use factory::HintHandlerFactory;
pub use prod::ProdHintHandler;
pub use reveal_all::RevealAllHintHandler;
pub use session::HintSession;
pub use timer::{
    EpochGuard, ManualScheduler, TimerHandle, TimerScheduler, TimerTask, TokioScheduler,
};

/// Notified whenever the help index of the tracked state changes.
///
/// The new value is read back through `HintHandler::current_help_index`,
/// which is safe to call from inside the callback.
pub trait HintMonitor: Send + Sync {
    fn on_help_index_changed(&self);
}

impl<F> HintMonitor for F
where
    F: Fn() + Send + Sync,
{
    fn on_help_index_changed(&self) {
        self();
    }
}

/// Decides when hints and the solution of the pending lesson state become
/// available, and tracks what the learner has revealed.
///
/// One handler serves one play-through. All calls are expected from a single
/// logical flow; timers resume on the scheduler the handler was built with.
pub trait HintHandler: Send + Sync {
    /// Reset tracking for a newly pending state.
    fn start_watching_for_hints_in_new_state(&self, state: LessonState);

    /// Rebuild tracking from a checkpoint. Elapsed time before the checkpoint
    /// was taken is not credited to any timer.
    fn resume_hints_for_saved_state(
        &self,
        tracked_wrong_answer_count: u32,
        help_index: HelpIndex,
        state: LessonState,
    );

    /// The pending state was completed; start tracking `next_state`.
    fn finish_state(&self, next_state: LessonState);

    /// Report the cumulative wrong-answer count for the pending state.
    fn handle_wrong_answer_submission(&self, wrong_answer_count: u32);

    /// Reveal the hint that is currently available.
    ///
    /// # Errors
    ///
    /// Returns `HintError::HintNotAvailable` unless the index is `NextAvailableHint(hint_index)`.
    fn view_hint(&self, hint_index: usize) -> Result<(), HintError>;

    /// Reveal the solution.
    ///
    /// # Errors
    ///
    /// Returns `HintError::SolutionNotAvailable` unless the index is `ShowSolution`.
    fn view_solution(&self) -> Result<(), HintError>;

    /// The learner went back to an already completed state; pause tracking.
    fn navigate_to_previous_state(&self);

    /// The learner returned to the pending state; resume tracking with fresh timers.
    fn navigate_back_to_latest_pending_state(&self);

    fn current_help_index(&self) -> HelpIndex;

    /// Progress to persist so the state can be resumed after a restart.
    fn checkpoint(&self) -> HintCheckpoint;
}
