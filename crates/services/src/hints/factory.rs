use std::sync::Arc;

use lesson_core::model::HintSettings;

use super::timer::TimerScheduler;
use super::{HintHandler, HintMonitor, ProdHintHandler, RevealAllHintHandler};

/// Builds the hint handler for a play-through.
///
/// The disclosure policy is picked here from `HintSettings::reveal_everything`
/// and nowhere else.
#[derive(Clone)]
pub struct HintHandlerFactory {
    settings: HintSettings,
    scheduler: Arc<dyn TimerScheduler>,
}

impl HintHandlerFactory {
    #[must_use]
    pub fn new(settings: HintSettings, scheduler: Arc<dyn TimerScheduler>) -> Self {
        Self {
            settings,
            scheduler,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &HintSettings {
        &self.settings
    }

    #[must_use]
    pub fn create(&self, monitor: Arc<dyn HintMonitor>) -> Box<dyn HintHandler> {
        if self.settings.reveal_everything() {
            Box::new(RevealAllHintHandler::new(monitor))
        } else {
            Box::new(ProdHintHandler::new(
                self.settings.clone(),
                Arc::clone(&self.scheduler),
                monitor,
            ))
        }
    }
}
