//! Injuries applied after a failed action.
use serde::{Deserialize, Serialize};

use crate::effects::{EffectDef, EffectKind, EffectRef};
use crate::repo::{EntityId, Repository};
use crate::roll::Roller;
use crate::world::{Character, EncounterDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum InjuryOutcome {
    /// The roll did not land under the encounter's injury chance.
    Spared { roll: i32 },
    /// The roll landed but the encounter defines no injury.
    NoInjuryDefined { roll: i32 },
    Injured { roll: i32, effect: EntityId },
    /// The character already held this injury; nothing changed.
    AlreadyInjured { roll: i32, effect: EntityId },
}

impl InjuryOutcome {
    #[must_use]
    pub const fn roll(self) -> i32 {
        match self {
            Self::Spared { roll }
            | Self::NoInjuryDefined { roll }
            | Self::Injured { roll, .. }
            | Self::AlreadyInjured { roll, .. } => roll,
        }
    }

    #[must_use]
    pub const fn newly_injured(self) -> bool {
        matches!(self, Self::Injured { .. })
    }
}

/// Injured when `roll < chance`; a chance of 100 still spares a roll of 100.
#[must_use]
pub const fn injury_hits(roll: i32, chance: u8) -> bool {
    roll < chance as i32
}

/// Attach an injury link unless the character already holds it.
///
/// Returns `true` when a new link was added.
pub fn attach_injury(character: &mut Character, effect: EntityId) -> bool {
    character.effects.insert(EffectRef::injury(effect))
}

/// Draw one injury roll for a failed action and apply the encounter's injury
/// when it lands.
pub fn apply<E, R>(
    character: &mut Character,
    encounter: &EncounterDef,
    effects: &E,
    roller: &mut R,
) -> InjuryOutcome
where
    E: Repository<EffectDef>,
    R: Roller + ?Sized,
{
    let roll = roller.injury_roll();
    if !injury_hits(roll, encounter.injury_chance) {
        return InjuryOutcome::Spared { roll };
    }
    let Some(effect) = encounter.injury else {
        return InjuryOutcome::NoInjuryDefined { roll };
    };
    match effects.get(effect) {
        Some(def) if def.kind == EffectKind::Injury => {}
        _ => {
            log::warn!(
                "{} references {effect} which is not an injury; skipping",
                encounter.name
            );
            return InjuryOutcome::NoInjuryDefined { roll };
        }
    }
    if attach_injury(character, effect) {
        log::info!("{} was injured by {} ({effect})", character.name, encounter.name);
        InjuryOutcome::Injured { roll, effect }
    } else {
        InjuryOutcome::AlreadyInjured { roll, effect }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::ScriptedRoller;
    use crate::stats::StatBlock;
    use crate::world::{EncounterKind, World};

    fn setup() -> (World, Character, EncounterDef) {
        let world = World::load_default().unwrap();
        let rabbit = world.find_encounter(EncounterKind::Prey, "rabbit").cloned().unwrap();
        let character = Character::new("ash", 1, StatBlock::default(), 20);
        (world, character, rabbit)
    }

    #[test]
    fn boundary_is_strictly_less_than() {
        assert!(injury_hits(19, 20));
        assert!(!injury_hits(20, 20));
        assert!(injury_hits(99, 100));
        assert!(!injury_hits(100, 100));
        assert!(!injury_hits(1, 0));
    }

    #[test]
    fn low_roll_attaches_the_encounter_injury() {
        let (world, mut character, rabbit) = setup();
        let mut roller = ScriptedRoller::default().with_injuries(&[5]);
        let outcome = apply(&mut character, &rabbit, &world.effects, &mut roller);
        assert_eq!(
            outcome,
            InjuryOutcome::Injured {
                roll: 5,
                effect: EntityId(1)
            }
        );
        assert!(character.effects.contains(&EffectRef::injury(EntityId(1))));
    }

    #[test]
    fn repeated_injury_leaves_one_link() {
        let (world, mut character, rabbit) = setup();
        let mut roller = ScriptedRoller::default().with_injuries(&[1, 1]);
        apply(&mut character, &rabbit, &world.effects, &mut roller);
        let second = apply(&mut character, &rabbit, &world.effects, &mut roller);
        assert!(matches!(second, InjuryOutcome::AlreadyInjured { .. }));
        assert_eq!(character.effects.len(), 1);
    }

    #[test]
    fn high_roll_spares_and_still_draws_once() {
        let (world, mut character, rabbit) = setup();
        let mut roller = ScriptedRoller::default().with_injuries(&[20]);
        let outcome = apply(&mut character, &rabbit, &world.effects, &mut roller);
        assert_eq!(outcome, InjuryOutcome::Spared { roll: 20 });
        assert_eq!(roller.calls(), 1);
        assert!(character.effects.is_empty());
    }

    #[test]
    fn encounter_without_injury_only_rolls() {
        let (world, mut character, _) = setup();
        let mut mouse = world.find_encounter(EncounterKind::Prey, "mouse").cloned().unwrap();
        mouse.injury_chance = 100;
        let mut roller = ScriptedRoller::default().with_injuries(&[1]);
        let outcome = apply(&mut character, &mouse, &world.effects, &mut roller);
        assert_eq!(outcome, InjuryOutcome::NoInjuryDefined { roll: 1 });
        assert!(character.effects.is_empty());
    }
}
