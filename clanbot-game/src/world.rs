//! World data model: characters, territories, encounter definitions, seasons
//! and age brackets.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::effects::{EffectDef, EffectKind, EffectLinks};
use crate::inventory::Inventory;
use crate::repo::{Entity, EntityId, MemoryRepository, Repository, normalize_name};
use crate::settings::{Settings, SettingsError};
use crate::stats::{Stat, StatBlock, StatOutOfRange};

const DEFAULT_WORLD_DATA: &str = include_str!("../data/default_world.json");

/// Placeholder id for rows that have not been inserted yet.
#[must_use]
pub const fn unassigned_id() -> EntityId {
    EntityId(0)
}

/// Why a stored world snapshot was refused.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world snapshot is not valid JSON")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("character `{name}` has an out-of-range attribute")]
    Stat {
        name: String,
        #[source]
        source: StatOutOfRange,
    },
    #[error("{kind} `{name}` has {stat} delta {delta} with the wrong sign")]
    EffectSign {
        name: String,
        kind: EffectKind,
        stat: Stat,
        delta: i32,
    },
}

/// Why a character may not act right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorBlock {
    Dead,
    Frozen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default = "unassigned_id")]
    pub id: EntityId,
    pub name: String,
    pub player_id: u64,
    #[serde(default)]
    pub stats: StatBlock,
    #[serde(default)]
    pub clan: Option<EntityId>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub nutrition: u32,
    #[serde(default)]
    pub hunger: u32,
    #[serde(default)]
    pub is_frozen: bool,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub curr_hunts: u32,
    #[serde(default)]
    pub effects: EffectLinks,
    #[serde(default)]
    pub inventory: Inventory,
    /// Last monthly tick period whose nutrition and aging were applied.
    #[serde(default)]
    pub last_tick_period: Option<u32>,
}

impl Character {
    #[must_use]
    pub fn new(name: &str, player_id: u64, stats: StatBlock, age: u32) -> Self {
        Self {
            id: unassigned_id(),
            name: normalize_name(name),
            player_id,
            stats,
            clan: None,
            role: None,
            age,
            nutrition: 0,
            hunger: 0,
            is_frozen: false,
            is_dead: false,
            curr_hunts: 0,
            effects: EffectLinks::new(),
            inventory: Inventory::default(),
            last_tick_period: None,
        }
    }

    #[must_use]
    pub const fn with_clan(mut self, clan: EntityId) -> Self {
        self.clan = Some(clan);
        self
    }

    /// Dead takes precedence over frozen.
    #[must_use]
    pub const fn block_reason(&self) -> Option<ActorBlock> {
        if self.is_dead {
            return Some(ActorBlock::Dead);
        }
        if self.is_frozen {
            return Some(ActorBlock::Frozen);
        }
        None
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.block_reason().is_none()
    }
}

impl Entity for Character {
    const KIND: &'static str = "character";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A named zone. True clans additionally have a leader and a prey pile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clan {
    #[serde(default = "unassigned_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub is_true_clan: bool,
    #[serde(default)]
    pub leader: Option<EntityId>,
}

impl Clan {
    #[must_use]
    pub fn new(name: &str, is_true_clan: bool) -> Self {
        Self {
            id: unassigned_id(),
            name: normalize_name(name),
            is_true_clan,
            leader: None,
        }
    }
}

impl Entity for Clan {
    const KIND: &'static str = "territory";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterKind {
    Prey,
    Herb,
}

impl EncounterKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Prey => "prey",
            Self::Herb => "herb",
        }
    }

    /// Skill added to the encounter's own attribute when scoring.
    #[must_use]
    pub const fn skill(self) -> Stat {
        match self {
            Self::Prey => Stat::Hunting,
            Self::Herb => Stat::Herbalism,
        }
    }
}

impl fmt::Display for EncounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Inclusive roll window a definition is eligible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityWindow {
    pub min: u8,
    pub max: u8,
}

impl RarityWindow {
    #[must_use]
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(self, value: i32) -> bool {
        (i32::from(self.min)..=i32::from(self.max)).contains(&value)
    }
}

/// A prey or herb definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterDef {
    #[serde(default = "unassigned_id")]
    pub id: EntityId,
    pub name: String,
    pub kind: EncounterKind,
    pub stat: Stat,
    #[serde(default)]
    pub nutrition: u32,
    pub rarity: RarityWindow,
    #[serde(default)]
    pub sum_required: i32,
    /// Empty means eligible everywhere.
    #[serde(default)]
    pub territories: BTreeSet<EntityId>,
    #[serde(default)]
    pub injury: Option<EntityId>,
    #[serde(default)]
    pub injury_chance: u8,
}

impl EncounterDef {
    #[must_use]
    pub fn new(name: &str, kind: EncounterKind, stat: Stat, rarity: RarityWindow) -> Self {
        Self {
            id: unassigned_id(),
            name: normalize_name(name),
            kind,
            stat,
            nutrition: 0,
            rarity,
            sum_required: 0,
            territories: BTreeSet::new(),
            injury: None,
            injury_chance: 0,
        }
    }

    #[must_use]
    pub const fn requiring(mut self, sum_required: i32) -> Self {
        self.sum_required = sum_required;
        self
    }

    #[must_use]
    pub const fn feeding(mut self, nutrition: u32) -> Self {
        self.nutrition = nutrition;
        self
    }

    #[must_use]
    pub fn in_territory(mut self, territory: EntityId) -> Self {
        self.territories.insert(territory);
        self
    }

    #[must_use]
    pub const fn injuring(mut self, injury: EntityId, chance: u8) -> Self {
        self.injury = Some(injury);
        self.injury_chance = chance;
        self
    }

    /// Territory eligibility: unassociated definitions are found anywhere;
    /// associated ones only inside one of their territories.
    #[must_use]
    pub fn eligible_in(&self, territory: Option<EntityId>) -> bool {
        if self.territories.is_empty() {
            return true;
        }
        territory.is_some_and(|territory| self.territories.contains(&territory))
    }
}

impl Entity for EncounterDef {
    const KIND: &'static str = "encounter";

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

/// One node in the season ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    #[serde(default = "unassigned_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub hunt_mod: i32,
    #[serde(default)]
    pub herb_mod: i32,
    #[serde(default)]
    pub is_active: bool,
    pub next: String,
}

impl Season {
    #[must_use]
    pub fn new(name: &str, hunt_mod: i32, herb_mod: i32, next: &str) -> Self {
        Self {
            id: unassigned_id(),
            name: normalize_name(name),
            hunt_mod,
            herb_mod,
            is_active: false,
            next: normalize_name(next),
        }
    }

    /// Roll offset this season applies to encounters of `kind`.
    #[must_use]
    pub const fn modifier_for(&self, kind: EncounterKind) -> i32 {
        match kind {
            EncounterKind::Prey => self.hunt_mod,
            EncounterKind::Herb => self.herb_mod,
        }
    }
}

impl Entity for Season {
    const KIND: &'static str = "season";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Age bracket: characters younger than `max_age` need `food_required`
/// nutrition per monthly tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBracket {
    #[serde(default = "unassigned_id")]
    pub id: EntityId,
    pub name: String,
    pub max_age: u32,
    pub food_required: u32,
}

impl AgeBracket {
    #[must_use]
    pub fn new(name: &str, max_age: u32, food_required: u32) -> Self {
        Self {
            id: unassigned_id(),
            name: normalize_name(name),
            max_age,
            food_required,
        }
    }
}

impl Entity for AgeBracket {
    const KIND: &'static str = "age bracket";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One prey item lying in a clan's pile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PileEntry {
    pub clan: EntityId,
    pub prey: EntityId,
    /// Monotonic insertion stamp; lower is older.
    pub added_at: u64,
}

/// Everything the engine reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct World {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub characters: MemoryRepository<Character>,
    #[serde(default)]
    pub clans: MemoryRepository<Clan>,
    #[serde(default)]
    pub encounters: MemoryRepository<EncounterDef>,
    #[serde(default)]
    pub effects: MemoryRepository<EffectDef>,
    #[serde(default)]
    pub seasons: MemoryRepository<Season>,
    #[serde(default)]
    pub ages: MemoryRepository<AgeBracket>,
    #[serde(default)]
    pub piles: Vec<PileEntry>,
    #[serde(default)]
    pub pile_clock: u64,
    /// Last monthly period whose season advance and pile decay were applied.
    #[serde(default)]
    pub last_monthly_period: Option<u32>,
}

impl World {
    /// Bundled starter world: seasons ring, age brackets, one clan and one
    /// territory, default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled data no longer parses or validates.
    pub fn load_default() -> Result<Self, WorldError> {
        Self::from_json(DEFAULT_WORLD_DATA)
    }

    /// Parse and validate a stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Parse`] for malformed JSON or repeated row ids,
    /// and the matching [`WorldError`] variant when [`World::validate`] fails.
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let world: Self = serde_json::from_str(json)?;
        world.validate()?;
        Ok(world)
    }

    /// Check the rules serde cannot express: settings tables, stored
    /// attribute ranges and effect delta signs.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation found.
    pub fn validate(&self) -> Result<(), WorldError> {
        self.settings.validate()?;
        for character in self.characters.iter() {
            character.stats.validate().map_err(|source| WorldError::Stat {
                name: character.name.clone(),
                source,
            })?;
        }
        for effect in self.effects.iter() {
            if let Some(entry) = effect.wrong_sign() {
                return Err(WorldError::EffectSign {
                    name: effect.name.clone(),
                    kind: effect.kind,
                    stat: entry.stat,
                    delta: entry.delta,
                });
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn find_encounter(&self, kind: EncounterKind, name: &str) -> Option<&EncounterDef> {
        let wanted = normalize_name(name);
        self.encounters
            .iter()
            .find(|def| def.kind == kind && normalize_name(&def.name) == wanted)
    }

    #[must_use]
    pub fn find_effect(&self, kind: EffectKind, name: &str) -> Option<&EffectDef> {
        let wanted = normalize_name(name);
        self.effects
            .iter()
            .find(|def| def.kind == kind && normalize_name(&def.name) == wanted)
    }

    /// Age brackets ordered by their upper bound.
    #[must_use]
    pub fn age_brackets(&self) -> Vec<&AgeBracket> {
        let mut brackets: Vec<&AgeBracket> = self.ages.iter().collect();
        brackets.sort_by_key(|bracket| bracket.max_age);
        brackets
    }

    /// First bracket whose upper bound exceeds `age`.
    #[must_use]
    pub fn bracket_for(&self, age: u32) -> Option<&AgeBracket> {
        self.age_brackets()
            .into_iter()
            .find(|bracket| bracket.max_age > age)
    }
}
