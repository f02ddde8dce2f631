//! Runtime-tunable world settings.
//!
//! Settings are an explicit value handed to whoever resolves stats or runs
//! ticks. Nothing is cached process-wide, so a live change to a row takes
//! effect on the next resolution that is handed the updated value.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    DEFAULT_AGE_STEP, DEFAULT_HUNGER_PENALTIES, DEFAULT_HUNT_ATTEMPTS, DEFAULT_MAX_AGE,
    DEFAULT_MAX_HUNGER, KEY_AGE_STEP, KEY_HUNGER_FALLBACK, KEY_HUNGER_PEN_PREFIX,
    KEY_HUNT_ATTEMPTS, KEY_MAX_AGE, KEY_MAX_HUNGER, KEY_CONSUME_NUTRITION, KEY_STAT_FLOOR,
};

/// Penalty applied for a hunger severity with no configured table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HungerFallback {
    /// Subtract the severity number itself.
    #[default]
    Severity,
    /// Subtract nothing.
    Zero,
}

/// Floor applied to an effective stat after every modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatFloor {
    /// Negative values propagate into score comparisons.
    #[default]
    None,
    /// Effective stats never drop below zero.
    Zero,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("setting `{key}` has invalid value `{value}`")]
    InvalidValue { key: String, value: String },
    #[error("hunger penalty for severity {severity} must not be negative (got {value})")]
    NegativePenalty { severity: u32, value: i32 },
    #[error("hunger severity must be positive (got `{0}`)")]
    InvalidSeverity(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_hunt_attempts")]
    pub hunt_attempts: u32,
    #[serde(default = "Settings::default_max_hunger")]
    pub max_hunger: u32,
    #[serde(default = "Settings::default_max_age")]
    pub max_age: u32,
    #[serde(default = "Settings::default_age_step")]
    pub age_step: u32,
    #[serde(default = "Settings::default_hunger_penalties")]
    pub hunger_penalties: BTreeMap<u32, i32>,
    #[serde(default)]
    pub hunger_fallback: HungerFallback,
    #[serde(default)]
    pub stat_floor: StatFloor,
    #[serde(default)]
    pub consume_nutrition: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hunt_attempts: Self::default_hunt_attempts(),
            max_hunger: Self::default_max_hunger(),
            max_age: Self::default_max_age(),
            age_step: Self::default_age_step(),
            hunger_penalties: Self::default_hunger_penalties(),
            hunger_fallback: HungerFallback::default(),
            stat_floor: StatFloor::default(),
            consume_nutrition: false,
        }
    }
}

impl Settings {
    const fn default_hunt_attempts() -> u32 {
        DEFAULT_HUNT_ATTEMPTS
    }

    const fn default_max_hunger() -> u32 {
        DEFAULT_MAX_HUNGER
    }

    const fn default_max_age() -> u32 {
        DEFAULT_MAX_AGE
    }

    const fn default_age_step() -> u32 {
        DEFAULT_AGE_STEP
    }

    fn default_hunger_penalties() -> BTreeMap<u32, i32> {
        DEFAULT_HUNGER_PENALTIES.iter().copied().collect()
    }

    /// Penalty subtracted from every effective stat at this hunger severity.
    #[must_use]
    pub fn hunger_penalty(&self, severity: u32) -> i32 {
        if severity == 0 {
            return 0;
        }
        if let Some(value) = self.hunger_penalties.get(&severity) {
            return *value;
        }
        match self.hunger_fallback {
            HungerFallback::Severity => i32::try_from(severity).unwrap_or(i32::MAX),
            HungerFallback::Zero => 0,
        }
    }

    /// Build settings from `name = value` rows, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for malformed values; unknown keys are skipped.
    pub fn from_rows<I, K, V>(rows: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in rows {
            settings.apply_row(key.as_ref(), value.as_ref())?;
        }
        Ok(settings)
    }

    /// Apply one `name = value` row, as an admin edit would.
    ///
    /// Returns `false` when the key is not a known setting.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the value does not parse.
    pub fn apply_row(&mut self, key: &str, value: &str) -> Result<bool, SettingsError> {
        let key = key.trim();
        let value = value.trim();
        match key {
            KEY_HUNT_ATTEMPTS => self.hunt_attempts = parse_value(key, value)?,
            KEY_MAX_HUNGER => self.max_hunger = parse_value(key, value)?,
            KEY_MAX_AGE => self.max_age = parse_value(key, value)?,
            KEY_AGE_STEP => self.age_step = parse_value(key, value)?,
            KEY_CONSUME_NUTRITION => self.consume_nutrition = parse_value(key, value)?,
            KEY_HUNGER_FALLBACK => {
                self.hunger_fallback = match value {
                    "severity" => HungerFallback::Severity,
                    "zero" => HungerFallback::Zero,
                    _ => return Err(invalid(key, value)),
                };
            }
            KEY_STAT_FLOOR => {
                self.stat_floor = match value {
                    "none" => StatFloor::None,
                    "zero" => StatFloor::Zero,
                    _ => return Err(invalid(key, value)),
                };
            }
            _ => {
                let Some(severity) = key.strip_prefix(KEY_HUNGER_PEN_PREFIX) else {
                    log::warn!("ignoring unknown setting `{key}`");
                    return Ok(false);
                };
                let severity: u32 = severity
                    .parse()
                    .ok()
                    .filter(|severity| *severity > 0)
                    .ok_or_else(|| SettingsError::InvalidSeverity(severity.to_string()))?;
                let penalty: i32 = parse_value(key, value)?;
                if penalty < 0 {
                    return Err(SettingsError::NegativePenalty {
                        severity,
                        value: penalty,
                    });
                }
                self.hunger_penalties.insert(severity, penalty);
            }
        }
        Ok(true)
    }

    /// Render the settings back into `name = value` rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            (KEY_HUNT_ATTEMPTS.to_string(), self.hunt_attempts.to_string()),
            (KEY_MAX_HUNGER.to_string(), self.max_hunger.to_string()),
            (KEY_MAX_AGE.to_string(), self.max_age.to_string()),
            (KEY_AGE_STEP.to_string(), self.age_step.to_string()),
            (
                KEY_HUNGER_FALLBACK.to_string(),
                match self.hunger_fallback {
                    HungerFallback::Severity => "severity",
                    HungerFallback::Zero => "zero",
                }
                .to_string(),
            ),
            (
                KEY_STAT_FLOOR.to_string(),
                match self.stat_floor {
                    StatFloor::None => "none",
                    StatFloor::Zero => "zero",
                }
                .to_string(),
            ),
            (
                KEY_CONSUME_NUTRITION.to_string(),
                self.consume_nutrition.to_string(),
            ),
        ];
        rows.extend(self.hunger_penalties.iter().map(|(severity, value)| {
            (format!("{KEY_HUNGER_PEN_PREFIX}{severity}"), value.to_string())
        }));
        rows
    }

    /// Check values that serde alone cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NegativePenalty`] for a negative table entry.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (severity, value) in &self.hunger_penalties {
            if *value < 0 {
                return Err(SettingsError::NegativePenalty {
                    severity: *severity,
                    value: *value,
                });
            }
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
