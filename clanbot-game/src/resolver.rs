//! Effective attribute computation.
use crate::effects::EffectDef;
use crate::repo::Repository;
use crate::settings::{Settings, StatFloor};
use crate::stats::Stat;
use crate::world::{Character, World};

/// Per-source breakdown of one effective attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatBreakdown {
    pub base: i32,
    pub buffs: i32,
    pub penalties: i32,
    pub hunger: i32,
    pub total: i32,
}

/// Read-only view combining settings with the effect definitions table.
///
/// Built fresh for each resolution, so a settings edit is visible to the next
/// resolution that is handed the new value.
#[derive(Debug, Clone, Copy)]
pub struct StatResolver<'a, E: Repository<EffectDef>> {
    settings: &'a Settings,
    effects: &'a E,
}

impl<'a, E: Repository<EffectDef>> StatResolver<'a, E> {
    #[must_use]
    pub const fn new(settings: &'a Settings, effects: &'a E) -> Self {
        Self { settings, effects }
    }

    /// `base + buffs + penalties - hunger_penalty`, then the configured floor.
    #[must_use]
    pub fn breakdown(&self, character: &Character, stat: Stat) -> StatBreakdown {
        let base = character.stats.get(stat);
        let mut buffs = 0;
        let mut penalties = 0;
        for link in &character.effects {
            let Some(def) = self.effects.get(link.effect) else {
                log::warn!("{} holds missing effect {}", character.name, link.effect);
                continue;
            };
            let delta = def.delta_for(stat);
            if def.kind.is_penalty() {
                penalties += delta;
            } else {
                buffs += delta;
            }
        }
        let hunger = self.settings.hunger_penalty(character.hunger);
        let raw = base + buffs + penalties - hunger;
        let total = match self.settings.stat_floor {
            StatFloor::None => raw,
            StatFloor::Zero => raw.max(0),
        };
        StatBreakdown {
            base,
            buffs,
            penalties,
            hunger,
            total,
        }
    }

    #[must_use]
    pub fn effective(&self, character: &Character, stat: Stat) -> i32 {
        self.breakdown(character, stat).total
    }
}

impl World {
    /// Resolver bound to this world's settings and effect table.
    #[must_use]
    pub fn resolver(&self) -> StatResolver<'_, crate::repo::MemoryRepository<EffectDef>> {
        StatResolver::new(&self.settings, &self.effects)
    }

    /// Shorthand for one effective attribute.
    #[must_use]
    pub fn effective_stat(&self, character: &Character, stat: Stat) -> i32 {
        self.resolver().effective(character, stat)
    }
}
