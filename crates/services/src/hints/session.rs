use std::sync::Arc;

use lesson_core::Clock;
use lesson_core::model::{HelpIndex, LessonState, PlaythroughId, SavedCheckpoint};
use storage::repository::{CheckpointRepository, StorageError};
use tracing::info;

use super::{HintHandler, HintHandlerFactory, HintMonitor};
use crate::error::HintSessionError;

/// Hint tracking for one play-through, with checkpoint save and restore.
pub struct HintSession {
    playthrough: PlaythroughId,
    clock: Clock,
    handler: Box<dyn HintHandler>,
    checkpoints: Arc<dyn CheckpointRepository>,
}

impl HintSession {
    #[must_use]
    pub fn new(
        playthrough: PlaythroughId,
        factory: &HintHandlerFactory,
        monitor: Arc<dyn HintMonitor>,
        checkpoints: Arc<dyn CheckpointRepository>,
    ) -> Self {
        Self {
            playthrough,
            clock: Clock::default(),
            handler: factory.create(monitor),
            checkpoints,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn playthrough(&self) -> PlaythroughId {
        self.playthrough
    }

    #[must_use]
    pub fn handler(&self) -> &dyn HintHandler {
        self.handler.as_ref()
    }

    #[must_use]
    pub fn help_index(&self) -> HelpIndex {
        self.handler.current_help_index()
    }

    pub fn enter_state(&self, state: LessonState) {
        self.handler.start_watching_for_hints_in_new_state(state);
    }

    pub fn submit_wrong_answer(&self, wrong_answer_count: u32) {
        self.handler.handle_wrong_answer_submission(wrong_answer_count);
    }

    pub fn finish_state(&self, next_state: LessonState) {
        self.handler.finish_state(next_state);
    }

    /// # Errors
    ///
    /// Returns `HintSessionError::Hint` if the hint is not currently available.
    pub fn view_hint(&self, hint_index: usize) -> Result<(), HintSessionError> {
        Ok(self.handler.view_hint(hint_index)?)
    }

    /// # Errors
    ///
    /// Returns `HintSessionError::Hint` if the solution is not currently available.
    pub fn view_solution(&self) -> Result<(), HintSessionError> {
        Ok(self.handler.view_solution()?)
    }

    pub fn navigate_to_previous_state(&self) {
        self.handler.navigate_to_previous_state();
    }

    pub fn navigate_back_to_latest_pending_state(&self) {
        self.handler.navigate_back_to_latest_pending_state();
    }

    /// Persist the current hint progress.
    ///
    /// # Errors
    ///
    /// Returns `HintSessionError::Storage` if persistence fails.
    pub async fn save_checkpoint(&self) -> Result<SavedCheckpoint, HintSessionError> {
        let saved = SavedCheckpoint {
            playthrough: self.playthrough,
            checkpoint: self.handler.checkpoint(),
            saved_at: self.clock.now(),
        };
        self.checkpoints.save_checkpoint(&saved).await?;
        Ok(saved)
    }

    /// Resume `state` from the saved checkpoint, or start it fresh if none exists.
    ///
    /// # Errors
    ///
    /// Returns `HintSessionError::Storage` if the checkpoint cannot be loaded.
    pub async fn restore(&self, state: LessonState) -> Result<HelpIndex, HintSessionError> {
        match self.checkpoints.get_checkpoint(self.playthrough).await? {
            Some(saved) => {
                let away = self.clock.elapsed_since(saved.saved_at);
                info!(
                    playthrough = %self.playthrough,
                    away_secs = away.num_seconds(),
                    "restoring hint checkpoint; elapsed time is not credited"
                );
                self.handler.resume_hints_for_saved_state(
                    saved.checkpoint.tracked_wrong_answer_count,
                    saved.checkpoint.help_index,
                    state,
                );
            }
            None => {
                info!(playthrough = %self.playthrough, "no hint checkpoint; starting fresh");
                self.handler.start_watching_for_hints_in_new_state(state);
            }
        }
        Ok(self.handler.current_help_index())
    }

    /// Drop the saved checkpoint once the play-through is over.
    ///
    /// # Errors
    ///
    /// Returns `HintSessionError::Storage` on storage failures other than a missing checkpoint.
    pub async fn discard_checkpoint(&self) -> Result<(), HintSessionError> {
        match self.checkpoints.delete_checkpoint(self.playthrough).await {
            Ok(()) | Err(StorageError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
