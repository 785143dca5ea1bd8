//! Thermal plant side of the digital twin: network parameters, the discrete
//! model factory, the "true" plant instance and its noisy room sensor.

use nalgebra::Vector2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

pub mod error;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{DiscreteModel, Mismatch, PlantParameters};

/// The simulated physical plant. Built from its own (possibly mismatched)
/// parameters and never shared with the estimator's model.
#[derive(Clone, Debug)]
pub struct Plant {
    model: DiscreteModel,
    x: Vector2<f64>,
}

impl Plant {
    /// Plant at rest with both nodes at `initial_c`.
    pub fn new(model: DiscreteModel, initial_c: f64) -> Self {
        Self {
            model,
            x: Vector2::new(initial_c, initial_c),
        }
    }

    /// `[T_room, T_sample]`
    pub fn state(&self) -> Vector2<f64> {
        self.x
    }

    /// Room temperature, the only measured quantity.
    pub fn output(&self) -> f64 {
        self.model.output(&self.x)
    }

    /// Advance one sample interval with control `u` and ambient `ambient_c`.
    pub fn step(&mut self, u: f64, ambient_c: f64) {
        self.x = self.model.advance(&self.x, u, ambient_c);
    }
}

/// Room temperature sensor with additive Gaussian noise.
///
/// Owns the run's random source so that runs seeded alike read alike,
/// regardless of what other runs are doing concurrently.
#[derive(Clone, Debug)]
pub struct Sensor {
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl Sensor {
    pub fn new(seed: u64, noise_std: f64) -> ConfigResult<Self> {
        error::ensure_non_negative("noise std", noise_std)?;
        let noise = if noise_std > 0.0 {
            Some(Normal::new(0.0, noise_std).map_err(|_| ConfigError::InvalidArg {
                what: "noise std",
            })?)
        } else {
            None
        };
        Ok(Self {
            noise,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn read_temp(&mut self, true_temp: f64) -> f64 {
        match &self.noise {
            Some(normal) => true_temp + normal.sample(&mut self.rng),
            None => true_temp,
        }
    }
}
