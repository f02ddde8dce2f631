//! Hunting and herb gathering resolution.
//!
//! Both actions share one pipeline: preconditions, encounter selection, score
//! against the encounter's required points, and an injury check on failure.
//! Hunting additionally spends one of the character's per-season attempts.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consequences::{self, InjuryOutcome};
use crate::constants::MSG_INTERNAL_ERROR;
use crate::encounters::{self, EncounterRequest};
use crate::repo::{EntityId, Lookup, RepoError, Repository, normalize_name};
use crate::roll::Roller;
use crate::seasons::active_season;
use crate::stats::Stat;
use crate::world::{ActorBlock, Character, Clan, EncounterDef, EncounterKind, World};

/// User-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    NotFound,
    InvalidState,
    AttemptsExhausted,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },
    #[error("character `{name}` is dead")]
    Dead { name: String },
    #[error("character `{name}` is frozen")]
    Frozen { name: String },
    #[error("character `{name}` used {used} of {cap} hunts this season")]
    AttemptsExhausted { name: String, used: u32, cap: u32 },
    #[error(transparent)]
    Repository(RepoError),
}

impl From<RepoError> for ActionError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { kind, key } => Self::NotFound { kind, name: key },
            other => Self::Repository(other),
        }
    }
}

impl ActionError {
    #[must_use]
    pub const fn category(&self) -> ActionCategory {
        match self {
            Self::NotFound { .. } => ActionCategory::NotFound,
            Self::Dead { .. } | Self::Frozen { .. } => ActionCategory::InvalidState,
            Self::AttemptsExhausted { .. } => ActionCategory::AttemptsExhausted,
            Self::Repository(_) => ActionCategory::Internal,
        }
    }

    /// Text suitable for showing to the player.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { kind, name } => format!("There is no {kind} called {name}."),
            Self::Dead { name } => format!("{name} has joined StarClan and can no longer act."),
            Self::Frozen { name } => format!("{name} is frozen and cannot act right now."),
            Self::AttemptsExhausted { name, cap, .. } => {
                format!("{name} has already hunted {cap} times this season.")
            }
            Self::Repository(_) => MSG_INTERNAL_ERROR.to_string(),
        }
    }
}

/// Everything one hunt or gather produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub kind: EncounterKind,
    pub character: EntityId,
    pub encounter: Option<EncounterDef>,
    pub success: bool,
    pub roll: i32,
    pub modifier: i32,
    pub score: Option<i32>,
    pub faith_bonus: i32,
    pub injury: Option<InjuryOutcome>,
}

impl ActionOutcome {
    /// `(definition_or_none, success)` as command handlers consume it.
    #[must_use]
    pub fn into_pair(self) -> (Option<EncounterDef>, bool) {
        (self.encounter, self.success)
    }

    /// "Found nothing" as opposed to "found something but failed".
    #[must_use]
    pub const fn found_nothing(&self) -> bool {
        self.encounter.is_none()
    }
}

/// Resolve a hunt.
///
/// # Errors
///
/// Returns [`ActionError`] when a precondition fails; no roll is drawn and no
/// counter moves in that case.
pub fn hunt<R: Roller + ?Sized>(
    world: &mut World,
    character: &Lookup<Character>,
    territory: Option<&Lookup<Clan>>,
    roller: &mut R,
) -> Result<ActionOutcome, ActionError> {
    resolve(world, EncounterKind::Prey, character, territory, roller)
}

/// Resolve a herb gathering attempt. Gathering spends no hunt attempts.
///
/// # Errors
///
/// Returns [`ActionError`] when a precondition fails.
pub fn gather<R: Roller + ?Sized>(
    world: &mut World,
    character: &Lookup<Character>,
    territory: Option<&Lookup<Clan>>,
    roller: &mut R,
) -> Result<ActionOutcome, ActionError> {
    resolve(world, EncounterKind::Herb, character, territory, roller)
}

fn check_preconditions(
    world: &World,
    kind: EncounterKind,
    character: &Lookup<Character>,
    territory: Option<&Lookup<Clan>>,
) -> Result<(EntityId, Option<EntityId>), ActionError> {
    let id = world.characters.resolve_id(character)?;
    let row = world.characters.get(id).ok_or_else(|| ActionError::NotFound {
        kind: "character",
        name: id.to_string(),
    })?;
    match row.block_reason() {
        Some(ActorBlock::Dead) => return Err(ActionError::Dead { name: row.name.clone() }),
        Some(ActorBlock::Frozen) => return Err(ActionError::Frozen { name: row.name.clone() }),
        None => {}
    }
    let cap = world.settings.hunt_attempts;
    if kind == EncounterKind::Prey && row.curr_hunts >= cap {
        return Err(ActionError::AttemptsExhausted {
            name: row.name.clone(),
            used: row.curr_hunts,
            cap,
        });
    }
    let territory = match territory {
        Some(lookup) => Some(world.clans.resolve_id(lookup).map_err(|_| ActionError::NotFound {
            kind: "territory",
            name: match lookup {
                Lookup::ByName(name) => normalize_name(name),
                Lookup::ById(id) => id.to_string(),
                Lookup::Resolved(clan) => clan.name.clone(),
            },
        })?),
        None => None,
    };
    Ok((id, territory))
}

fn resolve<R: Roller + ?Sized>(
    world: &mut World,
    kind: EncounterKind,
    character: &Lookup<Character>,
    territory: Option<&Lookup<Clan>>,
    roller: &mut R,
) -> Result<ActionOutcome, ActionError> {
    let (id, territory) = check_preconditions(world, kind, character, territory)?;

    if kind == EncounterKind::Prey
        && let Some(row) = world.characters.get_mut(id)
    {
        row.curr_hunts = row.curr_hunts.saturating_add(1);
    }

    let season = match active_season(&world.seasons) {
        Ok(season) => Some(season),
        Err(err) => {
            log::warn!("resolving {kind} without a season modifier: {err}");
            None
        }
    };
    let pick = encounters::select(
        &EncounterRequest {
            kind,
            territory,
            season,
            definitions: &world.encounters,
        },
        roller,
    );

    let mut outcome = ActionOutcome {
        kind,
        character: id,
        encounter: None,
        success: false,
        roll: pick.roll,
        modifier: pick.modifier,
        score: None,
        faith_bonus: 0,
        injury: None,
    };
    let Some(encounter) = pick.encounter else {
        return Ok(outcome);
    };

    let row = world.characters.get(id).ok_or_else(|| ActionError::NotFound {
        kind: "character",
        name: id.to_string(),
    })?;
    let resolver = world.resolver();
    let mut score = resolver.effective(row, encounter.stat) + resolver.effective(row, kind.skill());
    let at_home = territory.is_some_and(|territory| {
        row.clan == Some(territory) && encounter.territories.contains(&territory)
    });
    if at_home {
        outcome.faith_bonus = resolver.effective(row, Stat::Faith);
        score += outcome.faith_bonus;
    }
    outcome.success = score >= encounter.sum_required;
    outcome.score = Some(score);
    log::debug!(
        "{} {kind} for {}: score {score} vs {} -> {}",
        row.name,
        encounter.name,
        encounter.sum_required,
        if outcome.success { "success" } else { "failure" }
    );

    if !outcome.success {
        let World {
            characters, effects, ..
        } = world;
        if let Some(row) = characters.get_mut(id) {
            outcome.injury = Some(consequences::apply(row, &encounter, &*effects, roller));
        }
    }
    outcome.encounter = Some(encounter);
    Ok(outcome)
}
