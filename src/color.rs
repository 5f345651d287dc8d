//! RGB swatch values and the per-trial color source.
//!
//! Each trial presents one freshly drawn swatch. Channels are sampled
//! independently and uniformly from the full 8-bit range, so the generator
//! has no notion of "green" itself; classification is a separate concern.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// An immutable 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as an array, in `[r, g, b]` order.
    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

/// Draws one uniformly random swatch per trial.
///
/// The entropy source is owned and injectable: sessions that need
/// reproducibility seed it explicitly, everything else uses OS entropy.
#[derive(Debug)]
pub struct ColorGenerator {
    rng: StdRng,
}

impl ColorGenerator {
    /// Deterministic generator for tests and replayable sessions.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn generate(&mut self) -> Rgb {
        Rgb::new(self.rng.gen(), self.rng.gen(), self.rng.gen())
    }
}
