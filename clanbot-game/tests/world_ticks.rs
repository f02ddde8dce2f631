use clanbot_game::inventory::{add_to_pile, eat};
use clanbot_game::tick::{decay_piles, monthly_jobs, weekly_jobs};
use clanbot_game::{
    Character, ClanEngine, EntityId, Lookup, MemoryStorage, Repository, ScriptedRoller, StatBlock,
    World, active_season, advance_season,
};

fn world_with(age: u32) -> (World, EntityId) {
    let mut world = World::load_default().unwrap();
    let clan = world.clans.find_by_name("riverclan").unwrap().id;
    let id = world
        .characters
        .insert(Character::new("ash", 1, StatBlock::default(), age).with_clan(clan))
        .unwrap();
    (world, id)
}

#[test]
fn kit_without_food_starves_after_max_hunger_is_exceeded() {
    let (mut world, id) = world_with(1);
    for period in 1..=3 {
        monthly_jobs(&mut world, period);
        let row = world.characters.get(id).unwrap();
        assert_eq!(row.hunger, period);
        assert!(!row.is_dead);
    }
    let report = monthly_jobs(&mut world, 4);
    assert_eq!(report.starved, vec![id]);
    let row = world.characters.get(id).unwrap();
    assert!(row.is_dead);
    // aging stops once the character starved
    assert_eq!(row.age, 7);
}

#[test]
fn eating_before_the_tick_clears_hunger() {
    let (mut world, id) = world_with(20);
    world.characters.get_mut(id).unwrap().hunger = 2;
    for _ in 0..2 {
        eat(&mut world, &Lookup::ById(id), Lookup::name("rabbit")).unwrap();
    }
    let report = monthly_jobs(&mut world, 1);
    assert_eq!(report.recovered, vec![id]);
    let row = world.characters.get(id).unwrap();
    assert_eq!(row.hunger, 0);
    // the tick reads nutrition, it does not spend it
    assert_eq!(row.nutrition, 6);
    let next = monthly_jobs(&mut world, 2);
    assert!(next.hunger_raised.is_empty());
}

#[test]
fn dead_characters_are_left_alone() {
    let (mut world, id) = world_with(20);
    world.characters.get_mut(id).unwrap().is_dead = true;
    monthly_jobs(&mut world, 1);
    let row = world.characters.get(id).unwrap();
    assert_eq!(row.age, 20);
    assert_eq!(row.hunger, 0);
    assert_eq!(row.last_tick_period, None);
}

#[test]
fn elder_dies_on_reaching_max_age() {
    let (mut world, id) = world_with(148);
    world.characters.get_mut(id).unwrap().nutrition = 5;
    let report = monthly_jobs(&mut world, 1);
    assert_eq!(report.died_of_age, vec![id]);
    assert!(world.characters.get(id).unwrap().is_dead);
}

#[test]
fn apprentice_boundary_asks_for_rebalance() {
    let (mut world, id) = world_with(10);
    world.characters.get_mut(id).unwrap().nutrition = 3;
    let report = monthly_jobs(&mut world, 1);
    assert_eq!(report.needs_rebalance, vec![id]);
    assert!(!world.characters.get(id).unwrap().is_dead);
}

#[test]
fn redelivered_period_does_not_double_hunger() {
    let (mut world, id) = world_with(20);
    monthly_jobs(&mut world, 9);
    monthly_jobs(&mut world, 9);
    monthly_jobs(&mut world, 8);
    assert_eq!(world.characters.get(id).unwrap().hunger, 1);
    assert_eq!(active_season(&world.seasons).unwrap().name, "Autumn");
    monthly_jobs(&mut world, 10);
    assert_eq!(world.characters.get(id).unwrap().hunger, 2);
}

#[test]
fn pile_decay_leaves_ceiling_half() {
    for n in 0..9_usize {
        let (mut world, _) = world_with(20);
        for _ in 0..n {
            add_to_pile(&mut world, &Lookup::name("riverclan"), Lookup::name("mouse")).unwrap();
        }
        let removed = decay_piles(&mut world);
        assert_eq!(removed, n / 2);
        assert_eq!(world.piles.len(), n.div_ceil(2));
        let oldest_kept = world.piles.iter().map(|entry| entry.added_at).min();
        if let Some(oldest) = oldest_kept {
            assert_eq!(oldest, (n / 2 + 1) as u64);
        }
    }
}

#[test]
fn season_ring_rotates_back_to_start() {
    let (mut world, _) = world_with(20);
    let start = active_season(&world.seasons).unwrap().id;
    let len = world.seasons.len();
    for step in 1..=len {
        advance_season(&mut world.seasons).unwrap();
        let active = world.seasons.iter().filter(|season| season.is_active).count();
        assert_eq!(active, 1, "step {step}");
    }
    assert_eq!(active_season(&world.seasons).unwrap().id, start);
}

#[test]
fn weekly_reset_restores_hunts() {
    let (mut world, id) = world_with(20);
    world.settings.hunt_attempts = 1;
    let ash = Lookup::ById(id);
    let mut roller = ScriptedRoller::constant(10);
    clanbot_game::hunt(&mut world, &ash, None, &mut roller).unwrap();
    assert!(clanbot_game::hunt(&mut world, &ash, None, &mut roller).is_err());
    weekly_jobs(&mut world);
    assert!(clanbot_game::hunt(&mut world, &ash, None, &mut roller).is_ok());
}

#[test]
fn engine_runs_ticks_through_storage() {
    let (world, id) = world_with(5);
    let engine = ClanEngine::new(MemoryStorage::with_world(world));
    for period in 1..=4 {
        engine.run_monthly(period).unwrap();
    }
    let saved = engine.storage().snapshot().unwrap();
    assert!(saved.characters.get(id).unwrap().is_dead);
    assert_eq!(active_season(&saved.seasons).unwrap().name, "Summer");
}
