//! Deterministic random number generation.
//!
//! RULE: Nothing in the generator may call any platform RNG.
//! All randomness flows through StageRng instances derived
//! from the single master seed in SimConfig.
//!
//! Each pipeline stage gets its own RNG stream, seeded deterministically
//! from (master_seed XOR stage_index). This means:
//!   - Adding a new stage never changes existing stages' streams.
//!   - Two noise passes over the same table draw from unrelated streams,
//!     so their selections are not correlated.
//!   - Each stage's stream is fully reproducible in isolation.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single pipeline stage.
pub struct StageRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StageRng {
    /// Create a stage RNG from the master seed and a stable
    /// stage index. The index must never change once assigned.
    pub fn new(master_seed: u64, stage_index: u64) -> Self {
        let derived_seed = master_seed ^ (stage_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an index in [0, len).
    pub fn index_below(&mut self, len: usize) -> usize {
        self.next_u64_below(len as u64) as usize
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Continuous uniform draw in [low, high).
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Integer uniform draw in [low, high], both ends inclusive.
    pub fn range_inclusive(&mut self, low: u32, high: u32) -> u32 {
        assert!(low <= high, "empty range {low}..={high}");
        low + self.next_u64_below(u64::from(high - low) + 1) as u32
    }

    /// Gaussian draw via Box–Muller. Always consumes exactly two uniforms;
    /// the paired sine variate is discarded so draw counts stay fixed.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = 1.0 - self.next_f64(); // (0, 1], keeps ln finite
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + std_dev * z
    }

    /// Pick an index from a weight vector. Weights need not sum to 1.
    /// Falls back to the last index on rounding shortfall.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> usize {
        assert!(!weights.is_empty(), "weights must not be empty");
        let total: f64 = weights.iter().sum();
        let roll = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if roll < cumulative {
                return i;
            }
        }
        weights.len() - 1
    }

    /// Uniform pick from a non-empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.index_below(items.len())]
    }

    /// In-place Fisher–Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index_below(i + 1);
            items.swap(i, j);
        }
    }

    /// Draw `n` distinct indices from [0, len) without replacement,
    /// in selection order. `n` is capped at `len`.
    pub fn sample_indices(&mut self, len: usize, n: usize) -> Vec<usize> {
        let n = n.min(len);
        let mut pool: Vec<usize> = (0..len).collect();
        // Partial Fisher–Yates: only the first n slots are settled.
        for i in 0..n {
            let j = i + self.index_below(len - i);
            pool.swap(i, j);
        }
        pool.truncate(n);
        pool
    }
}

/// All stage RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stage(&self, slot: StageSlot) -> StageRng {
        StageRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stage slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stage's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StageSlot {
    Catalog = 0,
    CatalogNoise = 1,
    Population = 2,
    EntryRouteMissing = 3,
    GenderMissing = 4,
    Simulation = 5,
    PerformanceMissing = 6,
    EnrolmentDuplicates = 7,
    StatusNoise = 8,
    // Add new stages here. Append only.
}

impl StageSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::CatalogNoise => "catalog_noise",
            Self::Population => "population",
            Self::EntryRouteMissing => "entry_route_missing",
            Self::GenderMissing => "gender_missing",
            Self::Simulation => "simulation",
            Self::PerformanceMissing => "performance_missing",
            Self::EnrolmentDuplicates => "enrolment_duplicates",
            Self::StatusNoise => "status_noise",
        }
    }
}
