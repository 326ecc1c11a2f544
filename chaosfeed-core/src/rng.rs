//! Deterministic randomness.
//!
//! Two layers:
//! - [`seeded_random`], a stateless hash from an integer coordinate to `[0, 1)`.
//!   The chaos price engine and the backfill volume both sample it, so a given
//!   timestamp always maps to the same value.
//! - [`RngHierarchy`], which expands one master seed into an independent
//!   `StdRng` per named stream. Sub-seeds are derived via BLAKE3 hashing, so a
//!   stream's sequence does not depend on which other streams exist or in
//!   which order they were created.

use rand::rngs::StdRng;
use rand::SeedableRng;

const HASH_MULTIPLIER: f64 = 12.9898;
const HASH_SCALE: f64 = 43758.5453;

/// Pure pseudo-random value in `[0, 1)` for an integer coordinate.
///
/// Sine of a large multiple, scaled, fractional part taken. The exact formula
/// is not a contract; purity and spread over `[0, 1)` are.
pub fn seeded_random(coordinate: i64) -> f64 {
    let v = (coordinate as f64 * HASH_MULTIPLIER).sin() * HASH_SCALE;
    let frac = v - v.floor();
    // v slightly below zero can round up to exactly 1.0
    if frac >= 1.0 {
        0.0
    } else {
        frac
    }
}

/// Named random streams, one per simulated component.
pub mod streams {
    pub const STREAK: &str = "streak";
    pub const SIGNALS: &str = "signals";
    pub const WALK: &str = "walk";
    pub const TAPE: &str = "tape";
    pub const VENUES: &str = "venues";
    pub const VOLUME: &str = "volume";
    pub const MARKET_VOLUME: &str = "market-volume";
    pub const ROTATION: &str = "rotation";
}

/// Deterministic RNG hierarchy.
///
/// The master seed is expanded into per-stream sub-seeds using BLAKE3.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Derive the sub-seed for a named stream.
    pub fn sub_seed(&self, stream: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng for a named stream.
    pub fn rng_for(&self, stream: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream))
    }
}
