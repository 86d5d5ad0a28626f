use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_INITIAL_HINT_SECS: u64 = 60;
const DEFAULT_ADDITIONAL_HINT_SECS: u64 = 30;
const DEFAULT_FROM_WRONG_ANSWER_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("{name} must be > 0 seconds")]
    InvalidDelay { name: &'static str },

    #[error("could not parse hint settings: {0}")]
    Parse(String),
}

/// Timing and policy configuration for hint disclosure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HintSettings {
    delay_initial_hint: Duration,
    delay_additional_hint: Duration,
    delay_from_wrong_answer: Duration,
    reveal_everything: bool,
}

/// Raw settings as read from configuration; missing values fall back to defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HintSettingsDraft {
    pub delay_initial_hint_secs: Option<u64>,
    pub delay_additional_hint_secs: Option<u64>,
    pub delay_from_wrong_answer_secs: Option<u64>,
    pub reveal_everything: Option<bool>,
}

impl HintSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// delay_initial_hint_secs = 60
    /// delay_additional_hint_secs = 30
    /// delay_from_wrong_answer_secs = 10
    /// reveal_everything = false
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Parse` if the document is malformed or has unknown keys.
    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        toml::from_str(raw).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Validate the draft, filling in defaults for missing values.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidDelay` if any delay is zero.
    pub fn validate(self) -> Result<HintSettings, SettingsError> {
        let delay_initial_hint = positive_delay(
            "delay_initial_hint_secs",
            self.delay_initial_hint_secs,
            DEFAULT_INITIAL_HINT_SECS,
        )?;
        let delay_additional_hint = positive_delay(
            "delay_additional_hint_secs",
            self.delay_additional_hint_secs,
            DEFAULT_ADDITIONAL_HINT_SECS,
        )?;
        let delay_from_wrong_answer = positive_delay(
            "delay_from_wrong_answer_secs",
            self.delay_from_wrong_answer_secs,
            DEFAULT_FROM_WRONG_ANSWER_SECS,
        )?;

        Ok(HintSettings {
            delay_initial_hint,
            delay_additional_hint,
            delay_from_wrong_answer,
            reveal_everything: self.reveal_everything.unwrap_or(false),
        })
    }
}

impl HintSettings {
    /// Build settings from explicit durations, for callers that do not go through a draft.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidDelay` if any delay is zero.
    pub fn new(
        delay_initial_hint: Duration,
        delay_additional_hint: Duration,
        delay_from_wrong_answer: Duration,
        reveal_everything: bool,
    ) -> Result<Self, SettingsError> {
        for (name, delay) in [
            ("delay_initial_hint", delay_initial_hint),
            ("delay_additional_hint", delay_additional_hint),
            ("delay_from_wrong_answer", delay_from_wrong_answer),
        ] {
            if delay.is_zero() {
                return Err(SettingsError::InvalidDelay { name });
            }
        }
        Ok(Self {
            delay_initial_hint,
            delay_additional_hint,
            delay_from_wrong_answer,
            reveal_everything,
        })
    }

    #[must_use]
    pub fn with_reveal_everything(mut self, reveal_everything: bool) -> Self {
        self.reveal_everything = reveal_everything;
        self
    }

    /// Delay before the first hint of a state unlocks.
    #[must_use]
    pub fn delay_initial_hint(&self) -> Duration {
        self.delay_initial_hint
    }

    /// Delay before the next item unlocks after a hint was viewed.
    #[must_use]
    pub fn delay_additional_hint(&self) -> Duration {
        self.delay_additional_hint
    }

    /// Delay before the next item unlocks after a wrong answer, once help has started.
    #[must_use]
    pub fn delay_from_wrong_answer(&self) -> Duration {
        self.delay_from_wrong_answer
    }

    #[must_use]
    pub fn reveal_everything(&self) -> bool {
        self.reveal_everything
    }
}

impl Default for HintSettings {
    fn default() -> Self {
        Self {
            delay_initial_hint: Duration::from_secs(DEFAULT_INITIAL_HINT_SECS),
            delay_additional_hint: Duration::from_secs(DEFAULT_ADDITIONAL_HINT_SECS),
            delay_from_wrong_answer: Duration::from_secs(DEFAULT_FROM_WRONG_ANSWER_SECS),
            reveal_everything: false,
        }
    }
}

fn positive_delay(
    name: &'static str,
    value: Option<u64>,
    default_secs: u64,
) -> Result<Duration, SettingsError> {
    match value.unwrap_or(default_secs) {
        0 => Err(SettingsError::InvalidDelay { name }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_uses_defaults() {
        let settings = HintSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, HintSettings::default());
        assert_eq!(settings.delay_initial_hint(), Duration::from_secs(60));
        assert_eq!(settings.delay_additional_hint(), Duration::from_secs(30));
        assert_eq!(settings.delay_from_wrong_answer(), Duration::from_secs(10));
        assert!(!settings.reveal_everything());
    }

    #[test]
    fn parses_toml_overrides() {
        let draft = HintSettingsDraft::from_toml_str(
            "delay_initial_hint_secs = 5\nreveal_everything = true\n",
        )
        .unwrap();
        let settings = draft.validate().unwrap();
        assert_eq!(settings.delay_initial_hint(), Duration::from_secs(5));
        assert_eq!(settings.delay_additional_hint(), Duration::from_secs(30));
        assert!(settings.reveal_everything());
    }

    #[test]
    fn rejects_zero_delay_and_unknown_keys() {
        let err = HintSettingsDraft {
            delay_from_wrong_answer_secs: Some(0),
            ..HintSettingsDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            SettingsError::InvalidDelay {
                name: "delay_from_wrong_answer_secs"
            }
        );

        assert!(matches!(
            HintSettingsDraft::from_toml_str("delay_hint = 3"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn explicit_constructor_rejects_zero() {
        let err = HintSettings::new(
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(1),
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SettingsError::InvalidDelay {
                name: "delay_initial_hint"
            }
        );
    }
}
