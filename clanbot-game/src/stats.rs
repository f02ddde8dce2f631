//! Character attributes
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{STAT_MAX, STAT_MIN};

/// The twelve base attributes every character carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Hunting,
    Agility,
    Hearing,
    Smell,
    Sight,
    Speed,
    Stamina,
    Strength,
    Combat,
    Herbalism,
    Healing,
    Faith,
}

impl Stat {
    pub const ALL: [Self; 12] = [
        Self::Hunting,
        Self::Agility,
        Self::Hearing,
        Self::Smell,
        Self::Sight,
        Self::Speed,
        Self::Stamina,
        Self::Strength,
        Self::Combat,
        Self::Herbalism,
        Self::Healing,
        Self::Faith,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Hunting => "hunting",
            Self::Agility => "agility",
            Self::Hearing => "hearing",
            Self::Smell => "smell",
            Self::Sight => "sight",
            Self::Speed => "speed",
            Self::Stamina => "stamina",
            Self::Strength => "strength",
            Self::Combat => "combat",
            Self::Herbalism => "herbalism",
            Self::Healing => "healing",
            Self::Faith => "faith",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown attribute `{0}`")]
pub struct UnknownStat(pub String);

impl FromStr for Stat {
    type Err = UnknownStat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|stat| stat.key() == wanted)
            .ok_or_else(|| UnknownStat(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{stat} must be between {min} and {max} (got {value})", min = STAT_MIN, max = STAT_MAX)]
pub struct StatOutOfRange {
    pub stat: Stat,
    pub value: i32,
}

/// Base attribute values as stored on the character row.
///
/// Values stay within `[STAT_MIN, STAT_MAX]` at rest; modifiers are only
/// applied at resolution time and never written back here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatBlock {
    #[serde(default)]
    pub hunting: i32,
    #[serde(default)]
    pub agility: i32,
    #[serde(default)]
    pub hearing: i32,
    #[serde(default)]
    pub smell: i32,
    #[serde(default)]
    pub sight: i32,
    #[serde(default)]
    pub speed: i32,
    #[serde(default)]
    pub stamina: i32,
    #[serde(default)]
    pub strength: i32,
    #[serde(default)]
    pub combat: i32,
    #[serde(default)]
    pub herbalism: i32,
    #[serde(default)]
    pub healing: i32,
    #[serde(default)]
    pub faith: i32,
}

impl StatBlock {
    #[must_use]
    pub const fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Hunting => self.hunting,
            Stat::Agility => self.agility,
            Stat::Hearing => self.hearing,
            Stat::Smell => self.smell,
            Stat::Sight => self.sight,
            Stat::Speed => self.speed,
            Stat::Stamina => self.stamina,
            Stat::Strength => self.strength,
            Stat::Combat => self.combat,
            Stat::Herbalism => self.herbalism,
            Stat::Healing => self.healing,
            Stat::Faith => self.faith,
        }
    }

    fn slot(&mut self, stat: Stat) -> &mut i32 {
        match stat {
            Stat::Hunting => &mut self.hunting,
            Stat::Agility => &mut self.agility,
            Stat::Hearing => &mut self.hearing,
            Stat::Smell => &mut self.smell,
            Stat::Sight => &mut self.sight,
            Stat::Speed => &mut self.speed,
            Stat::Stamina => &mut self.stamina,
            Stat::Strength => &mut self.strength,
            Stat::Combat => &mut self.combat,
            Stat::Herbalism => &mut self.herbalism,
            Stat::Healing => &mut self.healing,
            Stat::Faith => &mut self.faith,
        }
    }

    /// Overwrite one attribute, keeping the at-rest bounds.
    ///
    /// # Errors
    ///
    /// Returns [`StatOutOfRange`] when `value` falls outside the allowed range.
    pub fn set(&mut self, stat: Stat, value: i32) -> Result<(), StatOutOfRange> {
        if !(STAT_MIN..=STAT_MAX).contains(&value) {
            return Err(StatOutOfRange { stat, value });
        }
        *self.slot(stat) = value;
        Ok(())
    }

    /// Build a block from `(stat, value)` pairs; unspecified attributes are zero.
    ///
    /// # Errors
    ///
    /// Returns [`StatOutOfRange`] for the first value outside the allowed range.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, StatOutOfRange>
    where
        I: IntoIterator<Item = (Stat, i32)>,
    {
        let mut block = Self::default();
        for (stat, value) in pairs {
            block.set(stat, value)?;
        }
        Ok(block)
    }

    /// Check every attribute against the at-rest bounds.
    ///
    /// # Errors
    ///
    /// Returns [`StatOutOfRange`] for the first offending attribute.
    pub fn validate(&self) -> Result<(), StatOutOfRange> {
        for stat in Stat::ALL {
            let value = self.get(stat);
            if !(STAT_MIN..=STAT_MAX).contains(&value) {
                return Err(StatOutOfRange { stat, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_case_insensitively() {
        assert_eq!("Agility".parse::<Stat>().unwrap(), Stat::Agility);
        assert_eq!(" faith ".parse::<Stat>().unwrap(), Stat::Faith);
        assert!("luck".parse::<Stat>().is_err());
    }

    #[test]
    fn every_stat_key_round_trips() {
        for stat in Stat::ALL {
            assert_eq!(stat.key().parse::<Stat>().unwrap(), stat);
        }
    }

    #[test]
    fn set_rejects_values_outside_bounds() {
        let mut block = StatBlock::default();
        assert!(block.set(Stat::Speed, 10).is_ok());
        assert_eq!(
            block.set(Stat::Speed, 11),
            Err(StatOutOfRange {
                stat: Stat::Speed,
                value: 11
            })
        );
        assert!(block.set(Stat::Speed, -1).is_err());
        assert_eq!(block.get(Stat::Speed), 10);
    }

    #[test]
    fn validate_catches_deserialized_out_of_range_rows() {
        let block: StatBlock = serde_json::from_str(r#"{"smell": 12}"#).unwrap();
        assert_eq!(block.validate().unwrap_err().stat, Stat::Smell);
    }
}
