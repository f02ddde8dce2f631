//! Status effects: buffs, injuries, diseases and disabilities
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

use crate::repo::{Entity, EntityId, normalize_name};
use crate::stats::Stat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Buff,
    Injury,
    Disease,
    Disability,
}

impl EffectKind {
    pub const ALL: [Self; 4] = [Self::Buff, Self::Injury, Self::Disease, Self::Disability];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Buff => "buff",
            Self::Injury => "injury",
            Self::Disease => "disease",
            Self::Disability => "disability",
        }
    }

    /// Buffs raise attributes; every other kind is a penalty.
    #[must_use]
    pub const fn is_penalty(self) -> bool {
        !matches!(self, Self::Buff)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    pub stat: Stat,
    pub delta: i32,
}

pub type DeltaList = SmallVec<[StatDelta; 4]>;

/// An effect definition row together with its attribute deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDef {
    #[serde(default = "crate::world::unassigned_id")]
    pub id: EntityId,
    pub name: String,
    pub kind: EffectKind,
    #[serde(default)]
    pub deltas: DeltaList,
}

impl EffectDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: EffectKind, deltas: &[(Stat, i32)]) -> Self {
        Self {
            id: crate::world::unassigned_id(),
            name: normalize_name(&name.into()),
            kind,
            deltas: deltas
                .iter()
                .map(|&(stat, delta)| StatDelta { stat, delta })
                .collect(),
        }
    }

    /// Sum of this effect's deltas for one attribute.
    #[must_use]
    pub fn delta_for(&self, stat: Stat) -> i32 {
        self.deltas
            .iter()
            .filter(|entry| entry.stat == stat)
            .map(|entry| entry.delta)
            .sum()
    }

    /// First delta that moves its attribute the wrong way for this kind:
    /// buffs only raise attributes, every other kind only lowers them.
    #[must_use]
    pub fn wrong_sign(&self) -> Option<&StatDelta> {
        let penalty = self.kind.is_penalty();
        self.deltas
            .iter()
            .find(|entry| if penalty { entry.delta >= 0 } else { entry.delta <= 0 })
    }

    #[must_use]
    pub const fn link(&self) -> EffectRef {
        EffectRef {
            kind: self.kind,
            effect: self.id,
        }
    }
}

impl Entity for EffectDef {
    const KIND: &'static str = "effect";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unique_key(&self) -> String {
        format!("{}:{}", self.kind, normalize_name(&self.name))
    }
}

/// Link from a character to one effect definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectRef {
    pub kind: EffectKind,
    pub effect: EntityId,
}

impl EffectRef {
    #[must_use]
    pub const fn injury(effect: EntityId) -> Self {
        Self {
            kind: EffectKind::Injury,
            effect,
        }
    }
}

/// Effects currently held by one character. Set semantics make duplicate
/// links impossible.
pub type EffectLinks = BTreeSet<EffectRef>;
