mod checkpoint;
mod help_index;
mod ids;
mod lesson;
mod settings;

pub use checkpoint::{HintCheckpoint, SavedCheckpoint};
pub use help_index::{HelpIndex, HintError};
pub use ids::{ParseIdError, PlaythroughId};
pub use lesson::{Hint, LessonState, LessonStateDraft, LessonStateError, Solution, StateName};
pub use settings::{HintSettings, HintSettingsDraft, SettingsError};
