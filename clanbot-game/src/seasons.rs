//! Season ring: exactly one active season, advanced along `next` pointers.
use std::collections::BTreeSet;
use thiserror::Error;

use crate::repo::{EntityId, Repository, normalize_name};
use crate::world::Season;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeasonError {
    #[error("no season is active")]
    NoneActive,
    #[error("{count} seasons are active at once")]
    MultipleActive { count: usize },
    #[error("season `{season}` points at unknown season `{next}`")]
    DanglingNext { season: String, next: String },
    #[error("season ring does not visit `{season}`")]
    BrokenRing { season: String },
}

/// The single active season.
///
/// # Errors
///
/// Returns [`SeasonError`] when zero or several seasons are active.
pub fn active_season<S: Repository<Season>>(seasons: &S) -> Result<&Season, SeasonError> {
    let mut active = seasons.iter().filter(|season| season.is_active);
    let first = active.next().ok_or(SeasonError::NoneActive)?;
    let extra = active.count();
    if extra > 0 {
        return Err(SeasonError::MultipleActive { count: extra + 1 });
    }
    Ok(first)
}

fn next_id<S: Repository<Season>>(seasons: &S, season: &Season) -> Result<EntityId, SeasonError> {
    seasons
        .find_by_name(&season.next)
        .map(|next| next.id)
        .ok_or_else(|| SeasonError::DanglingNext {
            season: season.name.clone(),
            next: normalize_name(&season.next),
        })
}

/// Deactivate the current season and activate its successor. Returns the id of
/// the newly active season.
///
/// # Errors
///
/// Returns [`SeasonError`] for an invalid active set or a dangling pointer; the
/// table is left untouched in that case.
pub fn advance_season<S: Repository<Season>>(seasons: &mut S) -> Result<EntityId, SeasonError> {
    let current = active_season(seasons)?;
    let current_id = current.id;
    let current_name = current.name.clone();
    let next = next_id(seasons, current)?;
    if let Some(row) = seasons.get_mut(current_id) {
        row.is_active = false;
    }
    if let Some(row) = seasons.get_mut(next) {
        row.is_active = true;
        log::info!("season advanced from {current_name} to {}", row.name);
    }
    Ok(next)
}

/// Check the whole table forms one ring with a single active season.
///
/// # Errors
///
/// Returns the first [`SeasonError`] found.
pub fn validate_seasons<S: Repository<Season>>(seasons: &S) -> Result<(), SeasonError> {
    let start = active_season(seasons)?;
    let mut visited = BTreeSet::new();
    let mut cursor = start;
    while visited.insert(cursor.id) {
        let next = next_id(seasons, cursor)?;
        cursor = seasons.get(next).ok_or_else(|| SeasonError::DanglingNext {
            season: cursor.name.clone(),
            next: next.to_string(),
        })?;
    }
    if cursor.id != start.id {
        return Err(SeasonError::BrokenRing {
            season: start.name.clone(),
        });
    }
    if let Some(stray) = seasons.iter().find(|season| !visited.contains(&season.id)) {
        return Err(SeasonError::BrokenRing {
            season: stray.name.clone(),
        });
    }
    Ok(())
}
