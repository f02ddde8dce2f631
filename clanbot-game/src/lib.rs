//! Clanbot Game Engine
//!
//! Resolution rules for a clan roleplay bot: effective character attributes,
//! prey and herb encounters, success checks, injuries, and the scheduled
//! world effects that feed, age and decay the world. The crate has no chat
//! transport or persistence of its own; storage is reached through
//! [`WorldStorage`].

pub mod admin;
pub mod consequences;
pub mod constants;
pub mod effects;
pub mod encounters;
pub mod hunt;
pub mod inventory;
pub mod repo;
pub mod resolver;
pub mod roll;
pub mod seasons;
pub mod settings;
pub mod stats;
pub mod tick;
pub mod world;

use std::cell::RefCell;
use std::convert::Infallible;
use thiserror::Error;

// Re-export commonly used types
pub use admin::PolicyError;
pub use consequences::InjuryOutcome;
pub use effects::{EffectDef, EffectKind, EffectRef};
pub use encounters::{EncounterPick, EncounterRequest, eligible_set, select};
pub use hunt::{ActionCategory, ActionError, ActionOutcome, gather, hunt};
pub use inventory::{
    CatchChoice, Inventory, InventoryError, InventoryItem, add_to_pile, eat, pile_nutrition,
    settle_catch, take_from_pile,
};
pub use repo::{Entity, EntityId, Lookup, MemoryRepository, RepoError, Repository};
pub use resolver::{StatBreakdown, StatResolver};
pub use roll::{RngRoller, RollBundle, RollDraws, Roller, ScriptedRoller};
pub use seasons::{SeasonError, active_season, advance_season, validate_seasons};
pub use settings::{HungerFallback, Settings, SettingsError, StatFloor};
pub use stats::{Stat, StatBlock};
pub use tick::{MonthlyReport, TickError, WeeklyReport, monthly_jobs, weekly_jobs};
pub use world::{
    AgeBracket, Character, Clan, EncounterDef, EncounterKind, PileEntry, RarityWindow, Season,
    World, WorldError,
};

/// Trait for abstracting world snapshot persistence.
/// Platform-specific implementations should provide this
pub trait WorldStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the stored world, or `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read.
    fn load_world(&self) -> Result<Option<World>, Self::Error>;

    /// Replace the stored world.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save_world(&self, world: &World) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum EngineError<E: std::error::Error + 'static> {
    #[error("world storage failed")]
    Storage(#[source] E),
    #[error("bundled world data is invalid")]
    DefaultWorld(#[from] WorldError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Tick(#[from] TickError),
}

impl<E: std::error::Error + 'static> EngineError<E> {
    /// Text suitable for showing to the player. Anything that is not a
    /// domain refusal becomes the generic support message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Action(err) => err.user_message(),
            Self::Policy(err) => err.to_string(),
            Self::Inventory(err) => err.to_string(),
            Self::Storage(_) | Self::DefaultWorld(_) | Self::Tick(_) => {
                constants::MSG_INTERNAL_ERROR.to_string()
            }
        }
    }
}

/// Main engine: one load, mutate, save cycle per operation.
pub struct ClanEngine<S>
where
    S: WorldStorage,
{
    storage: S,
}

impl<S> ClanEngine<S>
where
    S: WorldStorage,
{
    /// Create a new engine over the provided storage
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Current world, or the bundled default world when storage is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the bundled data no longer validates.
    pub fn load(&self) -> Result<World, EngineError<S::Error>> {
        match self.storage.load_world().map_err(EngineError::Storage)? {
            Some(world) => Ok(world),
            None => Ok(World::load_default()?),
        }
    }

    /// Run `op` against the world and save only if it succeeds. A failed
    /// operation leaves the stored world untouched.
    ///
    /// # Errors
    ///
    /// Returns the operation's error or a storage error.
    pub fn transact<T, Err>(
        &self,
        op: impl FnOnce(&mut World) -> Result<T, Err>,
    ) -> Result<T, EngineError<S::Error>>
    where
        EngineError<S::Error>: From<Err>,
    {
        let mut world = self.load()?;
        let value = op(&mut world)?;
        self.storage
            .save_world(&world)
            .map_err(EngineError::Storage)?;
        Ok(value)
    }

    /// Resolve a hunt by character and optional territory name.
    ///
    /// # Errors
    ///
    /// Returns an error if a precondition fails or storage fails.
    pub fn hunt<R: Roller + ?Sized>(
        &self,
        character: &str,
        territory: Option<&str>,
        roller: &mut R,
    ) -> Result<ActionOutcome, EngineError<S::Error>> {
        let character = Lookup::name(character);
        let territory = territory.map(Lookup::name);
        self.transact(|world| hunt::hunt(world, &character, territory.as_ref(), roller))
    }

    /// Resolve a gather attempt by character and optional territory name.
    ///
    /// # Errors
    ///
    /// Returns an error if a precondition fails or storage fails.
    pub fn gather<R: Roller + ?Sized>(
        &self,
        character: &str,
        territory: Option<&str>,
        roller: &mut R,
    ) -> Result<ActionOutcome, EngineError<S::Error>> {
        let character = Lookup::name(character);
        let territory = territory.map(Lookup::name);
        self.transact(|world| hunt::gather(world, &character, territory.as_ref(), roller))
    }

    /// Run the monthly job for `period`.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn run_monthly(&self, period: u32) -> Result<MonthlyReport, EngineError<S::Error>> {
        self.transact(|world| Ok::<_, Infallible>(monthly_jobs(world, period)))
    }

    /// Run the weekly job.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn run_weekly(&self) -> Result<WeeklyReport, EngineError<S::Error>> {
        self.transact(|world| Ok::<_, Infallible>(weekly_jobs(world)))
    }
}

impl<E: std::error::Error + 'static> From<Infallible> for EngineError<E> {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// In-process storage holding one world snapshot.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    world: RefCell<Option<World>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn with_world(world: World) -> Self {
        Self {
            world: RefCell::new(Some(world)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<World> {
        self.world.borrow().clone()
    }
}

impl WorldStorage for MemoryStorage {
    type Error = Infallible;

    fn load_world(&self) -> Result<Option<World>, Self::Error> {
        Ok(self.world.borrow().clone())
    }

    fn save_world(&self, world: &World) -> Result<(), Self::Error> {
        *self.world.borrow_mut() = Some(world.clone());
        Ok(())
    }
}
