//! Scheduled world effects: hunger, aging, attempt resets and pile decay.
//!
//! The scheduler that triggers these jobs lives outside the crate. Monthly
//! processing is stamped with the period it ran for, on the world for the
//! season and pile steps and on each character for feeding and aging, so a
//! repeated delivery of the same period changes nothing.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::repo::{EntityId, Repository};
use crate::seasons::{SeasonError, advance_season};
use crate::world::{Character, World};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("no age bracket covers `{name}` at age {age}")]
    NoBracket { name: String, age: u32 },
    #[error(transparent)]
    Season(#[from] SeasonError),
}

/// What the nutrition step did to one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutritionStep {
    Fed,
    Recovered,
    HungerRaised { hunger: u32 },
    Starved,
}

/// What the aging step did to one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingStep {
    Aged { age: u32 },
    /// Reached a bracket boundary below the maximum age.
    NeedsRebalance { age: u32 },
    DiedOfAge { age: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub period: u32,
    pub season: Option<String>,
    pub season_error: Option<String>,
    pub pile_removed: usize,
    /// Season and pile steps were skipped because the period already ran.
    pub world_steps_skipped: bool,
    pub hunger_raised: Vec<EntityId>,
    pub recovered: Vec<EntityId>,
    pub starved: Vec<EntityId>,
    pub died_of_age: Vec<EntityId>,
    pub needs_rebalance: Vec<EntityId>,
    pub already_processed: Vec<EntityId>,
    pub failures: Vec<(EntityId, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub attempts_reset: usize,
}

/// Nutrition check for one character against its age bracket.
///
/// # Errors
///
/// Returns [`TickError::NoBracket`] when no bracket covers the character's age;
/// the character is left unchanged.
pub fn nutrition_check(
    world: &World,
    character: &mut Character,
) -> Result<NutritionStep, TickError> {
    let bracket = world
        .bracket_for(character.age)
        .ok_or_else(|| TickError::NoBracket {
            name: character.name.clone(),
            age: character.age,
        })?;
    let step = if character.nutrition < bracket.food_required {
        character.hunger = character.hunger.saturating_add(1);
        if character.hunger > world.settings.max_hunger {
            character.is_dead = true;
            NutritionStep::Starved
        } else {
            NutritionStep::HungerRaised {
                hunger: character.hunger,
            }
        }
    } else if character.hunger != 0 {
        character.hunger = 0;
        NutritionStep::Recovered
    } else {
        NutritionStep::Fed
    };
    if world.settings.consume_nutrition {
        character.nutrition = 0;
    }
    Ok(step)
}

/// Advance age by the configured step and react to bracket boundaries.
pub fn age_character(world: &World, character: &mut Character) -> AgingStep {
    let age = character.age.saturating_add(world.settings.age_step);
    character.age = age;
    let on_boundary = world.ages.iter().any(|bracket| bracket.max_age == age);
    if !on_boundary {
        return AgingStep::Aged { age };
    }
    if age >= world.settings.max_age {
        character.is_dead = true;
        AgingStep::DiedOfAge { age }
    } else {
        AgingStep::NeedsRebalance { age }
    }
}

/// Remove the oldest half of every clan's pile, rounding the removal down.
/// Entries with equal stamps keep their stored order. Returns how many went.
pub fn decay_piles(world: &mut World) -> usize {
    let mut by_clan: BTreeMap<EntityId, Vec<(u64, usize)>> = BTreeMap::new();
    for (index, entry) in world.piles.iter().enumerate() {
        by_clan
            .entry(entry.clan)
            .or_default()
            .push((entry.added_at, index));
    }
    let mut keep = vec![true; world.piles.len()];
    for mut entries in by_clan.into_values() {
        entries.sort_unstable();
        let remove = entries.len() / 2;
        for &(_, index) in &entries[..remove] {
            keep[index] = false;
        }
    }
    let before = world.piles.len();
    let mut flags = keep.into_iter();
    world.piles.retain(|_| flags.next().unwrap_or(true));
    let removed = before - world.piles.len();
    log::info!("pile decay removed {removed} entries");
    removed
}

/// Zero the per-season hunt counter of every active character.
pub fn reset_hunt_attempts(world: &mut World) -> usize {
    let mut reset = 0;
    for id in world.characters.ids() {
        if let Some(row) = world.characters.get_mut(id)
            && row.is_active()
        {
            row.curr_hunts = 0;
            reset += 1;
        }
    }
    reset
}

/// Monthly job: advance the season, decay piles, then feed and age every
/// active character once for `period`.
///
/// The season and pile steps run once per period; a repeated delivery of a
/// period at or below `World::last_monthly_period` skips them.
pub fn monthly_jobs(world: &mut World, period: u32) -> MonthlyReport {
    log::info!("monthly tick {period} starting");
    let mut report = MonthlyReport {
        period,
        ..MonthlyReport::default()
    };
    if world.last_monthly_period.is_some_and(|done| done >= period) {
        log::info!("season and piles already advanced for period {period}");
        report.world_steps_skipped = true;
    } else {
        match advance_season(&mut world.seasons) {
            Ok(id) => report.season = world.seasons.get(id).map(|season| season.name.clone()),
            Err(err) => {
                log::warn!("season not advanced: {err}");
                report.season_error = Some(TickError::from(err).to_string());
            }
        }
        report.pile_removed = decay_piles(world);
        world.last_monthly_period = Some(period);
    }

    for id in world.characters.ids() {
        let Some(mut row) = world.characters.get(id).cloned() else {
            continue;
        };
        if !row.is_active() {
            continue;
        }
        if row.last_tick_period.is_some_and(|done| done >= period) {
            report.already_processed.push(id);
            continue;
        }
        let nutrition = match nutrition_check(world, &mut row) {
            Ok(step) => step,
            Err(err) => {
                log::warn!("skipping {} this tick: {err}", row.name);
                report.failures.push((id, err.to_string()));
                continue;
            }
        };
        match nutrition {
            NutritionStep::Starved => {
                log::info!("{} starved to death", row.name);
                report.starved.push(id);
            }
            NutritionStep::HungerRaised { .. } => report.hunger_raised.push(id),
            NutritionStep::Recovered => report.recovered.push(id),
            NutritionStep::Fed => {}
        }
        if nutrition != NutritionStep::Starved {
            match age_character(world, &mut row) {
                AgingStep::DiedOfAge { age } => {
                    log::info!("{} died of old age at {age}", row.name);
                    report.died_of_age.push(id);
                }
                AgingStep::NeedsRebalance { .. } => report.needs_rebalance.push(id),
                AgingStep::Aged { .. } => {}
            }
        }
        row.last_tick_period = Some(period);
        if let Err(err) = world.characters.update(row) {
            log::warn!("could not store tick result for {id}: {err}");
            report.failures.push((id, err.to_string()));
        }
    }
    log::info!(
        "monthly tick {period} done: {} starved, {} died of age, {} failures",
        report.starved.len(),
        report.died_of_age.len(),
        report.failures.len()
    );
    report
}

/// Weekly job: reset hunt attempts.
pub fn weekly_jobs(world: &mut World) -> WeeklyReport {
    let attempts_reset = reset_hunt_attempts(world);
    log::info!("weekly tick reset {attempts_reset} hunt counters");
    WeeklyReport { attempts_reset }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatBlock;
    use crate::world::PileEntry;

    fn world_with(age: u32, nutrition: u32, hunger: u32) -> (World, EntityId) {
        let mut world = World::load_default().unwrap();
        let mut character = Character::new("ash", 1, StatBlock::default(), age);
        character.nutrition = nutrition;
        character.hunger = hunger;
        let id = world.characters.insert(character).unwrap();
        (world, id)
    }

    #[test]
    fn underfed_kit_gains_hunger() {
        let (world, id) = world_with(5, 0, 0);
        let mut row = world.characters.get(id).cloned().unwrap();
        assert_eq!(
            nutrition_check(&world, &mut row).unwrap(),
            NutritionStep::HungerRaised { hunger: 1 }
        );
    }

    #[test]
    fn hunger_past_max_kills() {
        let (world, id) = world_with(5, 0, 3);
        let mut row = world.characters.get(id).cloned().unwrap();
        assert_eq!(nutrition_check(&world, &mut row).unwrap(), NutritionStep::Starved);
        assert!(row.is_dead);
    }

    #[test]
    fn fed_character_recovers_and_keeps_nutrition() {
        let (mut world, id) = world_with(20, 5, 2);
        let mut row = world.characters.get(id).cloned().unwrap();
        assert_eq!(nutrition_check(&world, &mut row).unwrap(), NutritionStep::Recovered);
        assert_eq!(row.hunger, 0);
        assert_eq!(row.nutrition, 5);

        world.settings.consume_nutrition = true;
        let mut row = world.characters.get(id).cloned().unwrap();
        nutrition_check(&world, &mut row).unwrap();
        assert_eq!(row.nutrition, 0);
    }

    #[test]
    fn stocked_nutrition_lasts_across_months() {
        let (mut world, id) = world_with(20, 12, 0);
        monthly_jobs(&mut world, 1);
        assert_eq!(world.characters.get(id).unwrap().nutrition, 12);
        let second = monthly_jobs(&mut world, 2);
        assert!(second.hunger_raised.is_empty());
        assert_eq!(world.characters.get(id).unwrap().hunger, 0);
    }

    #[test]
    fn missing_bracket_is_an_error() {
        let (world, id) = world_with(150, 0, 0);
        let mut row = world.characters.get(id).cloned().unwrap();
        assert!(matches!(
            nutrition_check(&world, &mut row),
            Err(TickError::NoBracket { age: 150, .. })
        ));
        assert_eq!(row.hunger, 0);
    }

    #[test]
    fn aging_hits_boundaries() {
        let (world, _) = world_with(0, 0, 0);
        let mut young = Character::new("kit", 1, StatBlock::default(), 4);
        assert_eq!(age_character(&world, &mut young), AgingStep::NeedsRebalance { age: 6 });
        let mut middle = Character::new("mid", 1, StatBlock::default(), 20);
        assert_eq!(age_character(&world, &mut middle), AgingStep::Aged { age: 22 });
        let mut elder = Character::new("elder", 1, StatBlock::default(), 148);
        assert_eq!(age_character(&world, &mut elder), AgingStep::DiedOfAge { age: 150 });
        assert!(elder.is_dead);
    }

    #[test]
    fn pile_decay_keeps_newest_half_per_clan() {
        let mut world = World::default();
        for added_at in 1..=5 {
            world.piles.push(PileEntry {
                clan: EntityId(1),
                prey: EntityId(1),
                added_at,
            });
        }
        world.piles.push(PileEntry {
            clan: EntityId(2),
            prey: EntityId(1),
            added_at: 6,
        });
        assert_eq!(decay_piles(&mut world), 2);
        let left: Vec<u64> = world.piles.iter().map(|entry| entry.added_at).collect();
        assert_eq!(left, vec![3, 4, 5, 6]);
    }

    #[test]
    fn pile_decay_with_equal_stamps_removes_exactly_half() {
        let mut world = World::default();
        for prey in 1..=5 {
            world.piles.push(PileEntry {
                clan: EntityId(1),
                prey: EntityId(prey),
                added_at: 5,
            });
        }
        assert_eq!(decay_piles(&mut world), 2);
        let left: Vec<EntityId> = world.piles.iter().map(|entry| entry.prey).collect();
        assert_eq!(left, vec![EntityId(3), EntityId(4), EntityId(5)]);
    }

    #[test]
    fn monthly_jobs_are_idempotent_per_period() {
        let (mut world, id) = world_with(5, 0, 0);
        let first = monthly_jobs(&mut world, 1);
        assert_eq!(first.hunger_raised, vec![id]);
        let again = monthly_jobs(&mut world, 1);
        assert_eq!(again.already_processed, vec![id]);
        let row = world.characters.get(id).unwrap();
        assert_eq!(row.hunger, 1);
        assert_eq!(row.age, 7);
    }

    #[test]
    fn repeated_period_leaves_season_and_piles_alone() {
        let mut world = World::load_default().unwrap();
        for added_at in 1..=4 {
            world.piles.push(PileEntry {
                clan: EntityId(1),
                prey: EntityId(1),
                added_at,
            });
        }
        let first = monthly_jobs(&mut world, 7);
        assert_eq!(first.season.as_deref(), Some("Autumn"));
        assert_eq!(first.pile_removed, 2);

        let again = monthly_jobs(&mut world, 7);
        assert!(again.world_steps_skipped);
        assert_eq!(again.season, None);
        assert_eq!(again.pile_removed, 0);
        let active = crate::seasons::active_season(&world.seasons).unwrap();
        assert_eq!(active.name, "Autumn");
        assert_eq!(world.piles.len(), 2);
        assert_eq!(world.last_monthly_period, Some(7));

        let next = monthly_jobs(&mut world, 8);
        assert_eq!(next.season.as_deref(), Some("Winter"));
    }

    #[test]
    fn monthly_jobs_isolate_failures_and_skip_inactive() {
        let (mut world, ok) = world_with(20, 10, 0);
        let stuck = world
            .characters
            .insert(Character::new("old", 2, StatBlock::default(), 200))
            .unwrap();
        let mut frozen = Character::new("frost", 3, StatBlock::default(), 5);
        frozen.is_frozen = true;
        let frozen = world.characters.insert(frozen).unwrap();
        let report = monthly_jobs(&mut world, 4);
        assert_eq!(report.season.as_deref(), Some("Autumn"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, stuck);
        assert_eq!(world.characters.get(ok).unwrap().age, 22);
        assert_eq!(world.characters.get(frozen).unwrap().age, 5);
    }

    #[test]
    fn weekly_jobs_reset_active_characters_only() {
        let (mut world, id) = world_with(20, 0, 0);
        world.characters.get_mut(id).unwrap().curr_hunts = 4;
        let mut dead = Character::new("gone", 2, StatBlock::default(), 20);
        dead.is_dead = true;
        dead.curr_hunts = 2;
        let dead = world.characters.insert(dead).unwrap();
        let mut frozen = Character::new("frost", 3, StatBlock::default(), 20);
        frozen.is_frozen = true;
        frozen.curr_hunts = 3;
        let frozen = world.characters.insert(frozen).unwrap();
        assert_eq!(weekly_jobs(&mut world).attempts_reset, 1);
        assert_eq!(world.characters.get(id).unwrap().curr_hunts, 0);
        assert_eq!(world.characters.get(dead).unwrap().curr_hunts, 2);
        assert_eq!(world.characters.get(frozen).unwrap().curr_hunts, 3);
    }
}
