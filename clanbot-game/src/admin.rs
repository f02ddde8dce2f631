//! Entity-specific rules layered over the generic repositories.
//!
//! Each function validates one administrative edit and applies it to the
//! world. Nothing here rolls dice or resolves actions.
use thiserror::Error;

use crate::constants::{INJURY_CHANCE_MAX, ROLL_MAX, ROLL_MIN};
use crate::effects::{EffectDef, EffectKind, EffectRef};
use crate::repo::{Entity, EntityId, Lookup, RepoError, Repository, normalize_name};
use crate::settings::SettingsError;
use crate::stats::{Stat, StatBlock, StatOutOfRange};
use crate::world::{Character, Clan, EncounterDef, World};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Repository(#[from] RepoError),
    #[error(transparent)]
    Stat(#[from] StatOutOfRange),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("name must not be empty")]
    EmptyName,
    #[error("rarity window {min}..={max} must satisfy 1 <= min <= max <= 100")]
    InvalidRarity { min: u8, max: u8 },
    #[error("injury chance {0} exceeds 100")]
    InvalidInjuryChance(u8),
    #[error("required points must not be negative (got {0})")]
    NegativeRequirement(i32),
    #[error("{kind} `{name}` has {stat} delta {delta} with the wrong sign")]
    EffectSign {
        name: String,
        kind: EffectKind,
        stat: Stat,
        delta: i32,
    },
    #[error("`{name}` is a {found}, expected {expected}")]
    WrongEffectKind {
        name: String,
        expected: EffectKind,
        found: EffectKind,
    },
    #[error("`{0}` is a territory, not a clan")]
    NotATrueClan(String),
    #[error("`{character}` is not a member of `{clan}`")]
    NotAMember { character: String, clan: String },
}

fn require_name(name: &str) -> Result<String, PolicyError> {
    let name = normalize_name(name);
    if name.is_empty() {
        return Err(PolicyError::EmptyName);
    }
    Ok(name)
}

fn character_mut<'a>(
    world: &'a mut World,
    character: &Lookup<Character>,
) -> Result<&'a mut Character, PolicyError> {
    let id = world.characters.resolve_id(character)?;
    world
        .characters
        .get_mut(id)
        .ok_or_else(|| {
            PolicyError::from(RepoError::NotFound {
                kind: Character::KIND,
                key: id.to_string(),
            })
        })
}

/// Register a new character with validated attributes.
///
/// # Errors
///
/// Returns [`PolicyError`] for out-of-range attributes, an unknown clan, or a
/// duplicate name.
pub fn create_character(
    world: &mut World,
    name: &str,
    player_id: u64,
    stats: StatBlock,
    age: u32,
    clan: Option<&Lookup<Clan>>,
) -> Result<EntityId, PolicyError> {
    let name = require_name(name)?;
    stats.validate()?;
    let clan = clan.map(|lookup| world.clans.resolve_id(lookup)).transpose()?;
    let mut character = Character::new(&name, player_id, stats, age);
    character.clan = clan;
    let id = world.characters.insert(character)?;
    log::info!("registered character {name} ({id}) for player {player_id}");
    Ok(id)
}

/// Overwrite one base attribute within the at-rest bounds.
///
/// # Errors
///
/// Returns [`PolicyError`] for unknown characters or out-of-range values.
pub fn set_attribute(
    world: &mut World,
    character: &Lookup<Character>,
    stat: Stat,
    value: i32,
) -> Result<(), PolicyError> {
    let row = character_mut(world, character)?;
    row.stats.set(stat, value)?;
    Ok(())
}

/// # Errors
///
/// Returns [`PolicyError`] for unknown characters.
pub fn set_frozen(
    world: &mut World,
    character: &Lookup<Character>,
    frozen: bool,
) -> Result<(), PolicyError> {
    character_mut(world, character)?.is_frozen = frozen;
    Ok(())
}

/// Kill or revive a character. Reviving clears hunger so the next monthly
/// check does not kill the character again immediately.
///
/// # Errors
///
/// Returns [`PolicyError`] for unknown characters.
pub fn set_dead(
    world: &mut World,
    character: &Lookup<Character>,
    dead: bool,
) -> Result<(), PolicyError> {
    let row = character_mut(world, character)?;
    row.is_dead = dead;
    if !dead {
        row.hunger = 0;
    }
    Ok(())
}

/// Move a character into a clan or territory, or out of any.
///
/// # Errors
///
/// Returns [`PolicyError`] when either row does not resolve.
pub fn set_clan(
    world: &mut World,
    character: &Lookup<Character>,
    clan: Option<&Lookup<Clan>>,
) -> Result<(), PolicyError> {
    let clan = clan.map(|lookup| world.clans.resolve_id(lookup)).transpose()?;
    character_mut(world, character)?.clan = clan;
    Ok(())
}

/// Validate and insert a prey or herb definition.
///
/// # Errors
///
/// Returns [`PolicyError`] when the window, chance, or requirement is out of
/// range, or a referenced territory or injury does not exist.
pub fn create_encounter(world: &mut World, mut def: EncounterDef) -> Result<EntityId, PolicyError> {
    def.name = require_name(&def.name)?;
    let (min, max) = (def.rarity.min, def.rarity.max);
    if min < ROLL_MIN || max > ROLL_MAX || min > max {
        return Err(PolicyError::InvalidRarity { min, max });
    }
    if def.injury_chance > INJURY_CHANCE_MAX {
        return Err(PolicyError::InvalidInjuryChance(def.injury_chance));
    }
    if def.sum_required < 0 {
        return Err(PolicyError::NegativeRequirement(def.sum_required));
    }
    for territory in &def.territories {
        world.clans.resolve_id(&Lookup::ById(*territory))?;
    }
    if let Some(injury) = def.injury {
        let effect = world.effects.resolve(Lookup::ById(injury))?;
        if effect.kind != EffectKind::Injury {
            return Err(PolicyError::WrongEffectKind {
                name: effect.name,
                expected: EffectKind::Injury,
                found: effect.kind,
            });
        }
    }
    Ok(world.encounters.insert(def)?)
}

/// Validate and insert an effect definition: buffs only raise attributes,
/// every other kind only lowers them.
///
/// # Errors
///
/// Returns [`PolicyError::EffectSign`] for a delta with the wrong sign.
pub fn create_effect(world: &mut World, mut def: EffectDef) -> Result<EntityId, PolicyError> {
    def.name = require_name(&def.name)?;
    if let Some(entry) = def.wrong_sign() {
        return Err(PolicyError::EffectSign {
            name: def.name.clone(),
            kind: def.kind,
            stat: entry.stat,
            delta: entry.delta,
        });
    }
    Ok(world.effects.insert(def)?)
}

fn effect_ref(world: &World, kind: EffectKind, effect: &str) -> Result<EffectRef, PolicyError> {
    world
        .find_effect(kind, effect)
        .map(EffectDef::link)
        .ok_or_else(|| {
            RepoError::NotFound {
                kind: kind.key(),
                key: normalize_name(effect),
            }
            .into()
        })
}

/// Link an effect to a character. Returns `false` when it was already held.
///
/// # Errors
///
/// Returns [`PolicyError`] when the character or effect does not resolve.
pub fn attach_effect(
    world: &mut World,
    character: &Lookup<Character>,
    kind: EffectKind,
    effect: &str,
) -> Result<bool, PolicyError> {
    let link = effect_ref(world, kind, effect)?;
    Ok(character_mut(world, character)?.effects.insert(link))
}

/// Unlink an effect. Returns `false` when it was not held.
///
/// # Errors
///
/// Returns [`PolicyError`] when the character or effect does not resolve.
pub fn detach_effect(
    world: &mut World,
    character: &Lookup<Character>,
    kind: EffectKind,
    effect: &str,
) -> Result<bool, PolicyError> {
    let link = effect_ref(world, kind, effect)?;
    Ok(character_mut(world, character)?.effects.remove(&link))
}

/// # Errors
///
/// Returns [`PolicyError`] for an empty or duplicate name.
pub fn create_clan(
    world: &mut World,
    name: &str,
    is_true_clan: bool,
) -> Result<EntityId, PolicyError> {
    let name = require_name(name)?;
    Ok(world.clans.insert(Clan::new(&name, is_true_clan))?)
}

/// # Errors
///
/// Returns [`PolicyError`] for an unknown clan or a name already in use.
pub fn rename_clan(
    world: &mut World,
    clan: &Lookup<Clan>,
    new_name: &str,
) -> Result<(), PolicyError> {
    let new_name = require_name(new_name)?;
    let mut row = world.clans.resolve(clan.clone())?;
    row.name = new_name;
    world.clans.update(row)?;
    Ok(())
}

/// Make a member the leader of a true clan.
///
/// # Errors
///
/// Returns [`PolicyError`] when the clan is a plain territory or the
/// character does not belong to it.
pub fn appoint_leader(
    world: &mut World,
    clan: &Lookup<Clan>,
    character: &Lookup<Character>,
) -> Result<(), PolicyError> {
    let clan_id = world.clans.resolve_id(clan)?;
    let leader = world.characters.resolve(character.clone())?;
    let row = world
        .clans
        .get_mut(clan_id)
        .ok_or_else(|| {
            PolicyError::from(RepoError::NotFound {
                kind: Clan::KIND,
                key: clan_id.to_string(),
            })
        })?;
    if !row.is_true_clan {
        return Err(PolicyError::NotATrueClan(row.name.clone()));
    }
    if leader.clan != Some(clan_id) {
        return Err(PolicyError::NotAMember {
            character: leader.name,
            clan: row.name.clone(),
        });
    }
    row.leader = Some(leader.id);
    Ok(())
}

/// Apply one settings row edit.
///
/// # Errors
///
/// Returns [`PolicyError::Settings`] for malformed values.
pub fn update_setting(world: &mut World, key: &str, value: &str) -> Result<bool, PolicyError> {
    Ok(world.settings.apply_row(key, value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{EncounterKind, RarityWindow};

    fn world() -> World {
        World::load_default().unwrap()
    }

    #[test]
    fn create_character_validates_attributes_and_clan() {
        let mut world = world();
        let stats: StatBlock = serde_json::from_str(r#"{"combat": 11}"#).unwrap();
        assert!(matches!(
            create_character(&mut world, "ash", 1, stats, 0, None),
            Err(PolicyError::Stat(_))
        ));
        assert!(matches!(
            create_character(
                &mut world,
                "ash",
                1,
                StatBlock::default(),
                0,
                Some(&Lookup::name("skyclan"))
            ),
            Err(PolicyError::Repository(RepoError::NotFound { .. }))
        ));
        let riverclan = Lookup::name("riverclan");
        let id =
            create_character(&mut world, "ash", 1, StatBlock::default(), 0, Some(&riverclan))
                .unwrap();
        assert_eq!(world.characters.get(id).unwrap().clan, Some(EntityId(1)));
        assert!(matches!(
            create_character(&mut world, "ASH", 2, StatBlock::default(), 0, None),
            Err(PolicyError::Repository(RepoError::Duplicate { .. }))
        ));
    }

    #[test]
    fn set_attribute_keeps_bounds() {
        let mut world = world();
        let id = create_character(&mut world, "ash", 1, StatBlock::default(), 0, None).unwrap();
        set_attribute(&mut world, &Lookup::ById(id), Stat::Sight, 7).unwrap();
        assert!(set_attribute(&mut world, &Lookup::ById(id), Stat::Sight, 12).is_err());
        assert_eq!(world.characters.get(id).unwrap().stats.sight, 7);
    }

    #[test]
    fn revive_clears_hunger() {
        let mut world = world();
        let id = create_character(&mut world, "ash", 1, StatBlock::default(), 0, None).unwrap();
        world.characters.get_mut(id).unwrap().hunger = 4;
        set_dead(&mut world, &Lookup::ById(id), true).unwrap();
        set_dead(&mut world, &Lookup::ById(id), false).unwrap();
        let row = world.characters.get(id).unwrap();
        assert!(!row.is_dead);
        assert_eq!(row.hunger, 0);
    }

    #[test]
    fn encounter_rules_are_enforced() {
        let mut world = world();
        let base = EncounterDef::new(
            "squirrel",
            EncounterKind::Prey,
            Stat::Speed,
            RarityWindow::new(20, 10),
        );
        assert_eq!(
            create_encounter(&mut world, base.clone()),
            Err(PolicyError::InvalidRarity { min: 20, max: 10 })
        );
        let mut bad_chance = base.clone();
        bad_chance.rarity = RarityWindow::new(10, 20);
        bad_chance.injury_chance = 101;
        assert_eq!(
            create_encounter(&mut world, bad_chance),
            Err(PolicyError::InvalidInjuryChance(101))
        );
        let buff_injury =
            EncounterDef::new("adder", EncounterKind::Prey, Stat::Speed, RarityWindow::new(1, 5))
                .injuring(EntityId(5), 50);
        assert!(matches!(
            create_encounter(&mut world, buff_injury),
            Err(PolicyError::WrongEffectKind { .. })
        ));
        let window = RarityWindow::new(10, 20);
        let local = EncounterDef::new("squirrel", EncounterKind::Prey, Stat::Speed, window)
            .in_territory(EntityId(9));
        assert!(create_encounter(&mut world, local).is_err());
        let ok = EncounterDef::new("squirrel", EncounterKind::Prey, Stat::Speed, window)
            .requiring(6)
            .in_territory(EntityId(2));
        assert!(create_encounter(&mut world, ok).is_ok());
    }

    #[test]
    fn effect_deltas_follow_sign_rules() {
        let mut world = world();
        let bad = EffectDef::new("thorn", EffectKind::Injury, &[(Stat::Speed, 1)]);
        assert!(matches!(create_effect(&mut world, bad), Err(PolicyError::EffectSign { .. })));
        let bad = EffectDef::new("courage", EffectKind::Buff, &[(Stat::Combat, -1)]);
        assert!(matches!(create_effect(&mut world, bad), Err(PolicyError::EffectSign { .. })));
        let good = EffectDef::new("courage", EffectKind::Buff, &[(Stat::Combat, 2)]);
        assert!(create_effect(&mut world, good).is_ok());
    }

    #[test]
    fn attaching_twice_is_ignored() {
        let mut world = world();
        let id = create_character(&mut world, "ash", 1, StatBlock::default(), 0, None).unwrap();
        let who = Lookup::ById(id);
        assert!(attach_effect(&mut world, &who, EffectKind::Disease, "greencough").unwrap());
        assert!(!attach_effect(&mut world, &who, EffectKind::Disease, "greencough").unwrap());
        assert_eq!(world.characters.get(id).unwrap().effects.len(), 1);
        assert!(detach_effect(&mut world, &who, EffectKind::Disease, "greencough").unwrap());
        assert!(!detach_effect(&mut world, &who, EffectKind::Disease, "greencough").unwrap());
        assert!(attach_effect(&mut world, &who, EffectKind::Injury, "greencough").is_err());
    }

    #[test]
    fn leaders_must_be_members_of_true_clans() {
        let mut world = world();
        let riverclan = Lookup::name("riverclan");
        let member =
            create_character(&mut world, "ash", 1, StatBlock::default(), 0, Some(&riverclan))
                .unwrap();
        let outsider =
            create_character(&mut world, "birch", 2, StatBlock::default(), 0, None).unwrap();
        assert!(matches!(
            appoint_leader(&mut world, &Lookup::name("thunderpath"), &Lookup::ById(member)),
            Err(PolicyError::NotATrueClan(_))
        ));
        assert!(matches!(
            appoint_leader(&mut world, &Lookup::name("riverclan"), &Lookup::ById(outsider)),
            Err(PolicyError::NotAMember { .. })
        ));
        appoint_leader(&mut world, &Lookup::name("riverclan"), &Lookup::ById(member)).unwrap();
        assert_eq!(world.clans.find_by_name("riverclan").unwrap().leader, Some(member));
    }

    #[test]
    fn clans_are_created_and_renamed() {
        let mut world = world();
        let id = create_clan(&mut world, "shadowclan", true).unwrap();
        assert!(create_clan(&mut world, "Shadowclan", false).is_err());
        assert!(rename_clan(&mut world, &Lookup::ById(id), "riverclan").is_err());
        rename_clan(&mut world, &Lookup::ById(id), "windclan").unwrap();
        assert_eq!(world.clans.get(id).unwrap().name, "Windclan");
        assert!(matches!(create_clan(&mut world, "  ", true), Err(PolicyError::EmptyName)));
    }

    #[test]
    fn settings_rows_are_editable() {
        let mut world = world();
        assert!(update_setting(&mut world, "hunt_attempts", "3").unwrap());
        assert_eq!(world.settings.hunt_attempts, 3);
        assert!(update_setting(&mut world, "max_hunger", "x").is_err());
    }
}
