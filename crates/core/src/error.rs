use thiserror::Error;

use crate::model::{HintError, LessonStateError, SettingsError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Hint(#[from] HintError),
    #[error(transparent)]
    LessonState(#[from] LessonStateError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HelpIndex, HintSettingsDraft, LessonStateDraft};

    fn load(raw: &str, name: &str) -> Result<(), Error> {
        HintSettingsDraft::from_toml_str(raw)?.validate()?;
        LessonStateDraft::new(name).validate()?;
        Ok(())
    }

    #[test]
    fn wraps_layer_errors() {
        assert!(matches!(load("", " "), Err(Error::LessonState(_))));
        assert!(matches!(
            load("delay_initial_hint_secs = 0", "Q"),
            Err(Error::Settings(_))
        ));
        let err: Error = HintError::SolutionNotAvailable {
            current: HelpIndex::None,
        }
        .into();
        assert_eq!(err.to_string(), "cannot reveal solution for current index none");
    }
}
