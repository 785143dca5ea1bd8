//! Reference (setpoint) trajectories.

use serde::{Deserialize, Serialize};
use sim::ConfigResult;
use sim::error::{ConfigError, ensure_finite, ensure_non_negative};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Constant target for the whole run.
    Step,
    /// Linear ramp from the initial temperature, then hold.
    Ramp,
    /// Sequence of linear approaches to intermediate targets.
    Multistep,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Step, Profile::Ramp, Profile::Multistep];

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Step => "step",
            Profile::Ramp => "ramp",
            Profile::Multistep => "multistep",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Final target of the step and ramp profiles.
    pub target: f64,
    /// Share of the run spent ramping.
    pub ramp_fraction: f64,
    /// Where the multistep profile starts.
    pub multistep_start: f64,
    pub multistep_targets: Vec<f64>,
    /// Share of the run spent approaching each target.
    pub multistep_fractions: Vec<f64>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            target: 60.0,
            ramp_fraction: 0.6,
            multistep_start: 40.0,
            multistep_targets: vec![55.0, 45.0],
            multistep_fractions: vec![0.4, 0.4],
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        ensure_finite("target", self.target)?;
        ensure_non_negative("ramp fraction", self.ramp_fraction)?;
        ensure_finite("multistep start", self.multistep_start)?;
        if self.multistep_targets.len() != self.multistep_fractions.len() {
            return Err(ConfigError::InvalidArg {
                what: "multistep targets and fractions differ in length",
            });
        }
        for (&target, &fraction) in self.multistep_targets.iter().zip(&self.multistep_fractions) {
            ensure_finite("multistep target", target)?;
            ensure_non_negative("multistep fraction", fraction)?;
        }
        Ok(())
    }

    /// Reference sequence of `steps` samples for `profile`, starting from
    /// `initial_c` where the profile has no start of its own.
    pub fn reference(&self, profile: Profile, initial_c: f64, steps: usize) -> Vec<f64> {
        match profile {
            Profile::Step => vec![self.target; steps],
            Profile::Ramp => {
                let duration = fraction_of(self.ramp_fraction, steps);
                ramp(initial_c, self.target, duration, steps)
            }
            Profile::Multistep => {
                let legs: Vec<(f64, usize)> = self
                    .multistep_targets
                    .iter()
                    .zip(&self.multistep_fractions)
                    .map(|(&target, &fraction)| (target, fraction_of(fraction, steps)))
                    .collect();
                multistep(self.multistep_start, &legs, steps)
            }
        }
    }
}

fn fraction_of(fraction: f64, steps: usize) -> usize {
    (fraction * steps as f64) as usize
}

fn ramp(start: f64, end: f64, duration: usize, steps: usize) -> Vec<f64> {
    let slope = (end - start) / duration.max(1) as f64;
    (0..steps)
        .map(|k| if k < duration { start + slope * k as f64 } else { end })
        .collect()
}

fn multistep(start: f64, legs: &[(f64, usize)], steps: usize) -> Vec<f64> {
    let mut r = Vec::with_capacity(steps);
    let mut current = start;
    for &(target, duration) in legs {
        let inc = (target - current) / duration.max(1) as f64;
        for i in 0..duration {
            if r.len() >= steps {
                break;
            }
            r.push(current + inc * i as f64);
        }
        current = target;
        if r.len() >= steps {
            break;
        }
    }
    r.resize(steps, current);
    r
}
