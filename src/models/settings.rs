use serde::{Deserialize, Serialize};

use crate::error::PomoError;
use crate::models::SessionType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub focus_min: i64,
    pub short_break_min: i64,
    pub long_break_min: i64,
    pub long_break_interval: i64,
    pub auto_start_break: bool,
    pub auto_start_focus: bool,
    pub sound_enabled: bool,
    pub timezone: String,
}

impl Settings {
    pub fn defaults(timezone: impl Into<String>) -> Self {
        Self {
            focus_min: 25,
            short_break_min: 5,
            long_break_min: 15,
            long_break_interval: 4,
            auto_start_break: false,
            auto_start_focus: false,
            sound_enabled: true,
            timezone: timezone.into(),
        }
    }

    /// Default length of a session of the given type.
    pub fn duration_sec(&self, session_type: SessionType) -> i64 {
        let minutes = match session_type {
            SessionType::Focus => self.focus_min,
            SessionType::ShortBreak => self.short_break_min,
            SessionType::LongBreak => self.long_break_min,
        };
        minutes * 60
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub focus_min: Option<i64>,
    pub short_break_min: Option<i64>,
    pub long_break_min: Option<i64>,
    pub long_break_interval: Option<i64>,
    pub auto_start_break: Option<bool>,
    pub auto_start_focus: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub timezone: Option<String>,
}

impl SettingsPatch {
    pub fn validate(&self) -> Result<(), PomoError> {
        check_range("focus_min", self.focus_min, 1, 120)?;
        check_range("short_break_min", self.short_break_min, 1, 60)?;
        check_range("long_break_min", self.long_break_min, 1, 120)?;
        check_range("long_break_interval", self.long_break_interval, 2, 10)?;
        if let Some(ref tz) = self.timezone {
            crate::models::parse_timezone(tz)?;
        }
        Ok(())
    }

    pub fn apply(&self, current: &Settings) -> Settings {
        Settings {
            focus_min: self.focus_min.unwrap_or(current.focus_min),
            short_break_min: self.short_break_min.unwrap_or(current.short_break_min),
            long_break_min: self.long_break_min.unwrap_or(current.long_break_min),
            long_break_interval: self
                .long_break_interval
                .unwrap_or(current.long_break_interval),
            auto_start_break: self.auto_start_break.unwrap_or(current.auto_start_break),
            auto_start_focus: self.auto_start_focus.unwrap_or(current.auto_start_focus),
            sound_enabled: self.sound_enabled.unwrap_or(current.sound_enabled),
            timezone: self
                .timezone
                .clone()
                .unwrap_or_else(|| current.timezone.clone()),
        }
    }
}

fn check_range(field: &str, value: Option<i64>, min: i64, max: i64) -> Result<(), PomoError> {
    match value {
        Some(v) if v < min || v > max => Err(PomoError::validation(format!(
            "{field} must be between {min} and {max}"
        ))),
        _ => Ok(()),
    }
}
