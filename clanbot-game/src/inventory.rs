//! Character inventories, eating, and clan prey piles.
//!
//! These collaborators sit outside the resolution engine: the engine only
//! reports what was found, and callers decide whether the catch is kept,
//! eaten, discarded, or carried to the clan pile.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::constants::INVENTORY_CAPACITY;
use crate::repo::{EntityId, Lookup, RepoError, Repository};
use crate::world::{ActorBlock, Character, Clan, EncounterDef, EncounterKind, PileEntry, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub kind: EncounterKind,
    pub item: EntityId,
}

/// Bounded per-character item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Inventory {
    items: SmallVec<[InventoryItem; INVENTORY_CAPACITY]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("inventory already holds {capacity} items")]
    Full { capacity: usize },
    #[error("{kind} {item} is not in the inventory")]
    NotHeld { kind: EncounterKind, item: EntityId },
    #[error("character `{name}` cannot do that while {reason:?}")]
    Blocked { name: String, reason: ActorBlock },
    #[error("`{name}` is not prey")]
    NotPrey { name: String },
    #[error("territory `{name}` is not a clan and keeps no pile")]
    NotAClan { name: String },
    #[error("character `{name}` belongs to no clan")]
    Clanless { name: String },
    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl Inventory {
    #[must_use]
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`InventoryError::Full`] once the capacity is reached.
    pub fn add(&mut self, kind: EncounterKind, item: EntityId) -> Result<(), InventoryError> {
        if self.items.len() >= INVENTORY_CAPACITY {
            return Err(InventoryError::Full {
                capacity: INVENTORY_CAPACITY,
            });
        }
        self.items.push(InventoryItem { kind, item });
        Ok(())
    }

    /// Remove the first matching entry.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotHeld`] when nothing matches.
    pub fn remove(
        &mut self,
        kind: EncounterKind,
        item: EntityId,
    ) -> Result<InventoryItem, InventoryError> {
        let position = self
            .items
            .iter()
            .position(|entry| entry.kind == kind && entry.item == item)
            .ok_or(InventoryError::NotHeld { kind, item })?;
        Ok(self.items.remove(position))
    }

    /// Drop everything; returns how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }
}

/// What a player chose to do with a successful catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchChoice {
    Keep,
    Eat,
    Discard,
    Pile,
}

fn active_character_mut<'a>(
    world: &'a mut World,
    character: &Lookup<Character>,
) -> Result<&'a mut Character, InventoryError> {
    let id = world.characters.resolve_id(character)?;
    let row = world.characters.get_mut(id).ok_or(RepoError::NotFound {
        kind: "character",
        key: id.to_string(),
    })?;
    if let Some(reason) = row.block_reason() {
        return Err(InventoryError::Blocked {
            name: row.name.clone(),
            reason,
        });
    }
    Ok(row)
}

fn prey_definition(
    world: &World,
    prey: Lookup<EncounterDef>,
) -> Result<EncounterDef, InventoryError> {
    let def = match prey {
        Lookup::ByName(name) => world
            .find_encounter(EncounterKind::Prey, &name)
            .cloned()
            .ok_or(RepoError::NotFound {
                kind: "prey",
                key: name,
            })?,
        other => world.encounters.resolve(other)?,
    };
    if def.kind != EncounterKind::Prey {
        return Err(InventoryError::NotPrey { name: def.name });
    }
    Ok(def)
}

/// Eat one prey: the character's nutrition grows by the prey's nutrition.
///
/// Returns the new nutrition total.
///
/// # Errors
///
/// Returns [`InventoryError`] for unknown rows, non-prey, or characters that
/// cannot act.
pub fn eat(
    world: &mut World,
    character: &Lookup<Character>,
    prey: Lookup<EncounterDef>,
) -> Result<u32, InventoryError> {
    let def = prey_definition(world, prey)?;
    let row = active_character_mut(world, character)?;
    row.nutrition = row.nutrition.saturating_add(def.nutrition);
    log::debug!("{} ate {}, nutrition now {}", row.name, def.name, row.nutrition);
    Ok(row.nutrition)
}

/// Apply the follow-up choice for a successful catch.
///
/// # Errors
///
/// Returns [`InventoryError`] when the inventory is full, the character has no
/// clan to carry prey to, or a row does not resolve.
pub fn settle_catch(
    world: &mut World,
    character: &Lookup<Character>,
    catch: &EncounterDef,
    choice: CatchChoice,
) -> Result<(), InventoryError> {
    match choice {
        CatchChoice::Discard => {
            active_character_mut(world, character)?;
            Ok(())
        }
        CatchChoice::Keep => {
            let row = active_character_mut(world, character)?;
            row.inventory.add(catch.kind, catch.id)
        }
        CatchChoice::Eat => eat(world, character, Lookup::Resolved(catch.clone())).map(|_| ()),
        CatchChoice::Pile => {
            let row = active_character_mut(world, character)?;
            let clan = row.clan.ok_or_else(|| InventoryError::Clanless {
                name: row.name.clone(),
            })?;
            add_to_pile(world, &Lookup::ById(clan), Lookup::Resolved(catch.clone()))
        }
    }
}

fn pile_clan(world: &World, clan: &Lookup<Clan>) -> Result<EntityId, InventoryError> {
    let id = world.clans.resolve_id(clan)?;
    match world.clans.get(id) {
        Some(row) if row.is_true_clan => Ok(id),
        Some(row) => Err(InventoryError::NotAClan {
            name: row.name.clone(),
        }),
        None => Err(RepoError::NotFound {
            kind: "territory",
            key: id.to_string(),
        }
        .into()),
    }
}

/// Put one prey on a clan's pile, stamped with the next insertion time.
///
/// # Errors
///
/// Returns [`InventoryError`] when the clan is a plain territory or a row does
/// not resolve.
pub fn add_to_pile(
    world: &mut World,
    clan: &Lookup<Clan>,
    prey: Lookup<EncounterDef>,
) -> Result<(), InventoryError> {
    let clan = pile_clan(world, clan)?;
    let def = prey_definition(world, prey)?;
    world.pile_clock = world.pile_clock.saturating_add(1);
    world.piles.push(PileEntry {
        clan,
        prey: def.id,
        added_at: world.pile_clock,
    });
    Ok(())
}

/// Take the oldest matching prey off a clan's pile. Returns `false` when the
/// pile holds none.
///
/// # Errors
///
/// Returns [`InventoryError`] when the clan or prey does not resolve.
pub fn take_from_pile(
    world: &mut World,
    clan: &Lookup<Clan>,
    prey: Lookup<EncounterDef>,
) -> Result<bool, InventoryError> {
    let clan = pile_clan(world, clan)?;
    let def = prey_definition(world, prey)?;
    let oldest = world
        .piles
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.clan == clan && entry.prey == def.id)
        .min_by_key(|(_, entry)| entry.added_at)
        .map(|(index, _)| index);
    Ok(oldest.map(|index| world.piles.remove(index)).is_some())
}

/// Total nutrition lying in a clan's pile.
#[must_use]
pub fn pile_nutrition(world: &World, clan: EntityId) -> u32 {
    world
        .piles
        .iter()
        .filter(|entry| entry.clan == clan)
        .filter_map(|entry| world.encounters.get(entry.prey))
        .map(|def| def.nutrition)
        .sum()
}
