use controller::{HorizonConfig, PidConfig};
use estimator::EstimatorConfig;
use serde::{Deserialize, Serialize};
use sim::error::{ConfigError, ensure_finite, ensure_non_negative, ensure_positive};
use sim::{ConfigResult, Mismatch, PlantParameters};

use crate::profile::ProfileConfig;

/// Everything a run needs besides the scenario and the controller choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Sample interval in seconds.
    pub ts: f64,
    /// Simulated time in seconds; the run has `floor(duration_s / ts)` samples.
    pub duration_s: f64,
    /// Seed of the run's measurement noise.
    pub seed: u64,
    /// Standard deviation of the room sensor noise.
    pub noise_std: f64,
    /// Temperature above which samples count as constraint violations.
    pub upper_bound: Option<f64>,
    /// Starting temperature of both plant nodes.
    pub initial_temp: f64,
    /// Nominal parameters; the estimator and horizon controller use these
    /// unchanged, the plant uses them scaled by the scenario mismatch.
    pub plant: PlantParameters,
    pub pid: PidConfig,
    pub horizon: HorizonConfig,
    pub estimator: EstimatorConfig,
    pub profile: ProfileConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ts: 1.0,
            duration_s: 300.0,
            seed: 42,
            noise_std: 0.2,
            upper_bound: Some(65.0),
            initial_temp: 25.0,
            plant: PlantParameters::default(),
            pid: PidConfig::default(),
            horizon: HorizonConfig::default(),
            estimator: EstimatorConfig::default(),
            profile: ProfileConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn steps(&self) -> usize {
        (self.duration_s / self.ts) as usize
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ensure_positive("sample interval", self.ts)?;
        ensure_positive("duration", self.duration_s)?;
        if self.steps() < 1 {
            return Err(ConfigError::InvalidArg {
                what: "duration shorter than one sample interval",
            });
        }
        ensure_non_negative("noise std", self.noise_std)?;
        if let Some(bound) = self.upper_bound {
            ensure_finite("upper bound", bound)?;
        }
        ensure_finite("initial temperature", self.initial_temp)?;
        self.plant.validate()?;
        // the plant may run any mismatch variant, and each must stay stable
        for mismatch in Mismatch::ALL {
            let limit = self.plant.scaled(mismatch).euler_stability_limit();
            if self.ts > limit {
                return Err(ConfigError::Unstable { ts: self.ts, limit });
            }
        }
        self.pid.validate()?;
        self.horizon.validate()?;
        self.profile.validate()?;
        Ok(())
    }
}
