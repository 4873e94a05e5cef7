//! Random source для вариаций decals
//!
//! Все случайные решения (материал, разброс splatter, bleed roll) идут через
//! `RandomSource`, чтобы тесты могли подставить детерминированный источник.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomSource {
    /// Uniform float в [min, max] (границы можно передавать в любом порядке)
    fn range(&mut self, min: f32, max: f32) -> f32;

    /// Uniform float в [0, 100)
    fn roll_percent(&mut self) -> f32;

    /// Uniform индекс в [0, len); `None` для пустой коллекции
    fn pick(&mut self, len: usize) -> Option<usize>;
}

impl RandomSource for ChaCha8Rng {
    fn range(&mut self, min: f32, max: f32) -> f32 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        self.gen_range(low..=high)
    }

    fn roll_percent(&mut self) -> f32 {
        self.gen_range(0.0..100.0)
    }

    fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.gen_range(0..len))
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

impl RandomSource for DeterministicRng {
    fn range(&mut self, min: f32, max: f32) -> f32 {
        self.rng.range(min, max)
    }

    fn roll_percent(&mut self) -> f32 {
        self.rng.roll_percent()
    }

    fn pick(&mut self, len: usize) -> Option<usize> {
        self.rng.pick(len)
    }
}
