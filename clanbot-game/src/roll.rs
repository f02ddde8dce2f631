//! Percentile rolls and deterministic RNG streams.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;
use std::collections::VecDeque;

use crate::constants::{ROLL_MAX, ROLL_MIN, STREAM_CHOICE, STREAM_ENCOUNTER, STREAM_INJURY};

/// Source of every random decision the resolution engine makes.
pub trait Roller {
    /// Encounter roll, uniform in `[1, 100]`.
    fn roll(&mut self) -> i32;

    /// Uniform index into a non-empty candidate list of length `len`.
    fn pick(&mut self, len: usize) -> usize;

    /// Injury roll, uniform in `[1, 100]`. Drawn from its own stream so that
    /// injury checks never shift later encounter rolls.
    fn injury_roll(&mut self) -> i32;
}

fn percentile<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    i32::from(rng.gen_range(ROLL_MIN..=ROLL_MAX))
}

/// Deterministic bundle of RNG streams segregated by decision domain.
#[derive(Debug, Clone)]
pub struct RollBundle {
    encounter: CountingRng<SmallRng>,
    choice: CountingRng<SmallRng>,
    injury: CountingRng<SmallRng>,
}

/// Draw counts per stream, for reports and determinism checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RollDraws {
    pub encounter: u64,
    pub choice: u64,
    pub injury: u64,
}

impl RollBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            encounter: CountingRng::new(derive_stream_seed(seed, STREAM_ENCOUNTER)),
            choice: CountingRng::new(derive_stream_seed(seed, STREAM_CHOICE)),
            injury: CountingRng::new(derive_stream_seed(seed, STREAM_INJURY)),
        }
    }

    #[must_use]
    pub const fn draws(&self) -> RollDraws {
        RollDraws {
            encounter: self.encounter.draws(),
            choice: self.choice.draws(),
            injury: self.injury.draws(),
        }
    }
}

impl Roller for RollBundle {
    fn roll(&mut self) -> i32 {
        percentile(&mut self.encounter)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.choice.gen_range(0..len)
    }

    fn injury_roll(&mut self) -> i32 {
        percentile(&mut self.injury)
    }
}

/// Single-stream roller over any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRoller<R>(pub R);

impl<R: RngCore> Roller for RngRoller<R> {
    fn roll(&mut self) -> i32 {
        percentile(&mut self.0)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.0.gen_range(0..len)
    }

    fn injury_roll(&mut self) -> i32 {
        percentile(&mut self.0)
    }
}

/// Replays queued values. When a queue runs dry the roller falls back to the
/// configured default, which makes "roll mocked to a constant" a one-liner.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    rolls: VecDeque<i32>,
    picks: VecDeque<usize>,
    injuries: VecDeque<i32>,
    fallback_roll: i32,
    fallback_injury: i32,
    calls: u32,
}

impl ScriptedRoller {
    /// Every roll, injury roll and pick returns the same value.
    #[must_use]
    pub fn constant(roll: i32) -> Self {
        Self {
            fallback_roll: roll,
            fallback_injury: roll,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_rolls(mut self, rolls: &[i32]) -> Self {
        self.rolls.extend(rolls.iter().copied());
        self
    }

    #[must_use]
    pub fn with_picks(mut self, picks: &[usize]) -> Self {
        self.picks.extend(picks.iter().copied());
        self
    }

    #[must_use]
    pub fn with_injuries(mut self, injuries: &[i32]) -> Self {
        self.injuries.extend(injuries.iter().copied());
        self
    }

    /// Total draws taken from any queue.
    #[must_use]
    pub const fn calls(&self) -> u32 {
        self.calls
    }
}

impl Roller for ScriptedRoller {
    fn roll(&mut self) -> i32 {
        self.calls += 1;
        self.rolls.pop_front().unwrap_or(self.fallback_roll)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.calls += 1;
        self.picks.pop_front().unwrap_or(0).min(len.saturating_sub(1))
    }

    fn injury_roll(&mut self) -> i32 {
        self.calls += 1;
        self.injuries.pop_front().unwrap_or(self.fallback_injury)
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
