//! Encounter selection logic
use crate::repo::{EntityId, Repository};
use crate::roll::Roller;
use crate::world::{EncounterDef, EncounterKind, Season};

pub struct EncounterRequest<'a, D: Repository<EncounterDef>> {
    pub kind: EncounterKind,
    pub territory: Option<EntityId>,
    pub season: Option<&'a Season>,
    pub definitions: &'a D,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterPick {
    pub encounter: Option<EncounterDef>,
    pub roll: i32,
    pub modifier: i32,
    pub eligible: usize,
}

/// Definitions of `kind` whose rarity window contains `adjusted_roll` and that
/// may be found in `territory`. Ordered by id so a fixed roll always yields the
/// same list.
#[must_use]
pub fn eligible_set<'a, D: Repository<EncounterDef>>(
    definitions: &'a D,
    kind: EncounterKind,
    territory: Option<EntityId>,
    adjusted_roll: i32,
) -> Vec<&'a EncounterDef> {
    let mut eligible: Vec<&EncounterDef> = definitions
        .iter()
        .filter(|def| def.kind == kind)
        .filter(|def| def.rarity.contains(adjusted_roll))
        .filter(|def| def.eligible_in(territory))
        .collect();
    eligible.sort_by_key(|def| def.id);
    eligible
}

/// Roll once, build the eligible set, and choose uniformly within it.
///
/// An empty eligible set is the normal "found nothing" outcome.
pub fn select<D: Repository<EncounterDef>, R: Roller + ?Sized>(
    request: &EncounterRequest<'_, D>,
    roller: &mut R,
) -> EncounterPick {
    let roll = roller.roll();
    let modifier = request
        .season
        .map_or(0, |season| season.modifier_for(request.kind));
    let eligible = eligible_set(
        request.definitions,
        request.kind,
        request.territory,
        roll + modifier,
    );
    let encounter = if eligible.is_empty() {
        None
    } else {
        let index = roller.pick(eligible.len());
        eligible.get(index).map(|def| (*def).clone())
    };
    log::debug!(
        "{} roll {roll}{modifier:+} -> {} eligible, picked {:?}",
        request.kind,
        eligible.len(),
        encounter.as_ref().map(|def| def.name.as_str())
    );
    EncounterPick {
        encounter,
        roll,
        modifier,
        eligible: eligible.len(),
    }
}
