//! # Generation Context
//!
//! Owns every piece of mutable state a generation run touches: the random
//! number generator, the source pools and the counters. Column generators
//! receive it by `&mut`, so two contexts never share draws and a fixed seed
//! reproduces a run exactly.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::generate::counter::{CounterKey, Counters};
use crate::generate::pool::{DelimitedSource, PoolSampler};

pub struct GenerationContext {
    pub rng: StdRng,
    pub pools: PoolSampler,
    pub counters: Counters,
    seed: u64,
}

impl GenerationContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            pools: PoolSampler::new(),
            counters: Counters::new(),
            seed,
        }
    }

    /// Seed this context was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn draw_text(&mut self, path: &Path) -> Result<String> {
        self.pools.draw_text(path, &mut self.rng)
    }

    pub fn draw_delimited(&mut self, source: &DelimitedSource, column: &str) -> Result<String> {
        self.pools.draw_delimited(source, column, &mut self.rng)
    }

    pub fn increment(&mut self, key: impl Into<CounterKey>) -> u64 {
        self.counters.increment(key)
    }
}

impl std::fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field("seed", &self.seed)
            .field("pools", &self.pools)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}
