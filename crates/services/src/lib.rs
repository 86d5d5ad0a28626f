#![forbid(unsafe_code)]

pub mod error;
pub mod hints;

pub use lesson_core::Clock;
pub use lesson_core::model::{HelpIndex, HintCheckpoint, HintError, HintSettings, LessonState};

pub use error::HintSessionError;
pub use hints::{
    HintHandler, HintHandlerFactory, HintMonitor, HintSession, ManualScheduler, ProdHintHandler,
    RevealAllHintHandler, TimerHandle, TimerScheduler, TokioScheduler,
};
