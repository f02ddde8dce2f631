//! Centralized defaults and tuning constants for clan resolution.
//!
//! Values that administrators may change at runtime live in
//! [`crate::settings::Settings`]; the constants here are either the defaults
//! those settings fall back to or hard invariants of the data model.

// Attribute bounds ----------------------------------------------------------
pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 10;

// Roll bounds ---------------------------------------------------------------
pub const ROLL_MIN: u8 = 1;
pub const ROLL_MAX: u8 = 100;
pub const INJURY_CHANCE_MAX: u8 = 100;

// Inventory -----------------------------------------------------------------
pub const INVENTORY_CAPACITY: usize = 3;

// Settings defaults ---------------------------------------------------------
pub const DEFAULT_HUNT_ATTEMPTS: u32 = 5;
pub const DEFAULT_MAX_HUNGER: u32 = 3;
pub const DEFAULT_MAX_AGE: u32 = 150;
pub const DEFAULT_AGE_STEP: u32 = 2;
pub const DEFAULT_HUNGER_PENALTIES: &[(u32, i32)] = &[(1, 1), (2, 3), (3, 5)];

// Settings row keys ---------------------------------------------------------
pub(crate) const KEY_HUNT_ATTEMPTS: &str = "hunt_attempts";
pub(crate) const KEY_MAX_HUNGER: &str = "max_hunger";
pub(crate) const KEY_MAX_AGE: &str = "max_age";
pub(crate) const KEY_AGE_STEP: &str = "age_step";
pub(crate) const KEY_HUNGER_FALLBACK: &str = "hunger_fallback";
pub(crate) const KEY_STAT_FLOOR: &str = "stat_floor";
pub(crate) const KEY_CONSUME_NUTRITION: &str = "consume_nutrition";
pub(crate) const KEY_HUNGER_PEN_PREFIX: &str = "hunger_pen_";

// Roll stream tags ----------------------------------------------------------
pub(crate) const STREAM_ENCOUNTER: &[u8] = b"encounter";
pub(crate) const STREAM_CHOICE: &[u8] = b"choice";
pub(crate) const STREAM_INJURY: &[u8] = b"injury";

// User-facing texts ---------------------------------------------------------
pub const MSG_INTERNAL_ERROR: &str = "Something went wrong, please contact support.";
