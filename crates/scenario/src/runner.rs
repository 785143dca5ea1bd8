//! Closed-loop scenario runner: plant -> sensor -> estimator -> controller.

use controller::{HorizonController, Pid};
use estimator::Estimator;
use serde::{Deserialize, Serialize};
use sim::error::ensure_finite;
use sim::{ConfigResult, DiscreteModel, Mismatch, Plant, Sensor};

use crate::config::RunConfig;
use crate::metrics::Metrics;
use crate::profile::Profile;

/// One experiment configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Ambient temperature, constant over the run.
    pub ambient_c: f64,
    pub mismatch: Mismatch,
    pub profile: Profile,
}

impl Scenario {
    /// Scenario named `{profile}_Ta{ambient}_{mismatch}`.
    pub fn new(profile: Profile, ambient_c: f64, mismatch: Mismatch) -> Self {
        Self {
            name: format!(
                "{}_Ta{}_{}",
                profile.as_str(),
                ambient_c as i64,
                mismatch.as_str()
            ),
            ambient_c,
            mismatch,
            profile,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    #[serde(rename = "PID")]
    Pid,
    #[serde(rename = "MPC")]
    Mpc,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 2] = [ControllerKind::Pid, ControllerKind::Mpc];

    pub fn as_str(self) -> &'static str {
        match self {
            ControllerKind::Pid => "PID",
            ControllerKind::Mpc => "MPC",
        }
    }
}

/// Per-sample record of a run. All sequences have the same length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Sample interval in seconds.
    pub ts: f64,
    /// True room temperature.
    pub y: Vec<f64>,
    /// Noisy sensor reading the controllers saw.
    pub y_measured: Vec<f64>,
    /// Reference.
    pub r: Vec<f64>,
    /// Applied control.
    pub u: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(ts: f64, n: usize) -> Self {
        Self {
            ts,
            y: Vec::with_capacity(n),
            y_measured: Vec::with_capacity(n),
            r: Vec::with_capacity(n),
            u: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Time stamp of sample `k` in seconds.
    pub fn time(&self, k: usize) -> f64 {
        k as f64 * self.ts
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub metrics: Metrics,
    pub trajectory: Trajectory,
}

enum ActiveController {
    Pid(Pid),
    Horizon {
        ctl: HorizonController,
        r_seq: Vec<f64>,
    },
}

/// Run `scenario` in closed loop with the controller `kind`.
///
/// The plant is built from the nominal parameters scaled by the scenario's
/// mismatch; the estimator and horizon controller always use the nominal
/// model. Identical inputs give bit-identical outputs.
pub fn run_scenario(
    scenario: &Scenario,
    kind: ControllerKind,
    cfg: &RunConfig,
) -> ConfigResult<RunOutput> {
    cfg.validate()?;
    let ambient = ensure_finite("ambient temperature", scenario.ambient_c)?;
    let steps = cfg.steps();

    let plant_params = cfg.plant.scaled(scenario.mismatch);
    let mut plant = Plant::new(DiscreteModel::discretize(&plant_params, cfg.ts)?, cfg.initial_temp);
    let model = DiscreteModel::discretize(&cfg.plant, cfg.ts)?;

    let mut sensor = Sensor::new(cfg.seed, cfg.noise_std)?;
    let mut kf = Estimator::from_config(
        model,
        &cfg.estimator,
        cfg.initial_temp,
        cfg.noise_std * cfg.noise_std,
    )?;

    let mut controller = match kind {
        ControllerKind::Pid => ActiveController::Pid(Pid::new(cfg.pid, cfg.ts)?),
        ControllerKind::Mpc => ActiveController::Horizon {
            ctl: HorizonController::new(model, cfg.horizon)?,
            r_seq: vec![0.0; cfg.horizon.horizon],
        },
    };
    let mut u_prev = 0.0_f64.clamp(cfg.horizon.umin, cfg.horizon.umax);

    let reference = cfg.profile.reference(scenario.profile, cfg.initial_temp, steps);

    tracing::debug!(
        scenario = %scenario.name,
        controller = kind.as_str(),
        steps,
        seed = cfg.seed,
        "starting run"
    );

    let mut traj = Trajectory::with_capacity(cfg.ts, steps);
    for &r in &reference {
        let y_true = plant.output();
        let y_meas = sensor.read_temp(y_true);

        kf.update(y_meas);
        let x_est = kf.state();

        let u = match &mut controller {
            ActiveController::Pid(pid) => pid.step(r, y_meas),
            ActiveController::Horizon { ctl, r_seq } => {
                r_seq.fill(r);
                ctl.control(&x_est, &r_seq[..], u_prev, ambient)
            }
        };

        traj.y.push(y_true);
        traj.y_measured.push(y_meas);
        traj.r.push(r);
        traj.u.push(u);

        plant.step(u, ambient);
        kf.predict(u, ambient);
        u_prev = u;
    }

    let metrics = Metrics::compute(&traj, cfg.upper_bound);
    tracing::debug!(
        scenario = %scenario.name,
        controller = kind.as_str(),
        iae = metrics.iae,
        energy = metrics.energy_sum_u2,
        "run finished"
    );

    Ok(RunOutput {
        metrics,
        trajectory: traj,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim::ConfigError;

    fn short() -> RunConfig {
        RunConfig {
            duration_s: 40.0,
            ..Default::default()
        }
    }

    #[test]
    fn scenario_names_follow_grid_convention() {
        let s = Scenario::new(Profile::Multistep, 25.0, Mismatch::Minus20);
        assert_eq!(s.name, "multistep_Ta25_minus20");
        assert_eq!(Scenario::new(Profile::Step, 20.7, Mismatch::Nominal).name, "step_Ta20_nominal");
    }

    #[test]
    fn trajectory_has_one_sample_per_step() {
        let s = Scenario::new(Profile::Ramp, 25.0, Mismatch::Nominal);
        for kind in ControllerKind::ALL {
            let out = run_scenario(&s, kind, &short()).unwrap();
            let t = &out.trajectory;
            assert_eq!(t.len(), 40);
            assert_eq!(t.y_measured.len(), 40);
            assert_eq!(t.r.len(), 40);
            assert_eq!(t.u.len(), 40);
            assert_eq!(t.y[0], 25.0);
            assert_eq!(t.time(10), 10.0);
        }
    }

    #[test]
    fn first_sample_records_initial_state_and_noisy_reading() {
        let s = Scenario::new(Profile::Step, 25.0, Mismatch::Nominal);
        let out = run_scenario(&s, ControllerKind::Pid, &short()).unwrap();
        let t = &out.trajectory;
        assert_eq!(t.y[0], 25.0);
        assert_ne!(t.y_measured[0], t.y[0]);
        assert_eq!(t.u[0], 0.06);
    }

    #[test]
    fn mismatch_changes_the_plant_only() {
        let cfg = RunConfig {
            noise_std: 0.0,
            estimator: estimator::EstimatorConfig {
                r_var: Some(0.04),
                ..Default::default()
            },
            ..short()
        };
        let nominal = Scenario::new(Profile::Step, 25.0, Mismatch::Nominal);
        let plus = Scenario::new(Profile::Step, 25.0, Mismatch::Plus20);
        let a = run_scenario(&nominal, ControllerKind::Pid, &cfg).unwrap();
        let b = run_scenario(&plus, ControllerKind::Pid, &cfg).unwrap();
        // same first action, different plant response to it
        assert_eq!(a.trajectory.u[0], b.trajectory.u[0]);
        assert_ne!(a.trajectory.y[2], b.trajectory.y[2]);
    }

    #[test]
    fn invalid_config_fails_before_running() {
        let s = Scenario::new(Profile::Step, 25.0, Mismatch::Nominal);
        let cfg = RunConfig {
            ts: 0.0,
            ..Default::default()
        };
        assert!(run_scenario(&s, ControllerKind::Pid, &cfg).is_err());

        let cfg = RunConfig {
            noise_std: 0.0,
            ..Default::default()
        };
        // zero measurement variance would make the filter degenerate
        assert!(run_scenario(&s, ControllerKind::Mpc, &cfg).is_err());
    }

    #[test]
    fn non_finite_ambient_is_rejected() {
        for ambient in [f64::NAN, f64::INFINITY] {
            let s = Scenario::new(Profile::Step, ambient, Mismatch::Nominal);
            for kind in ControllerKind::ALL {
                assert!(matches!(
                    run_scenario(&s, kind, &short()),
                    Err(ConfigError::NonFinite { .. })
                ));
            }
        }
    }

    #[test]
    fn unstable_sample_interval_is_rejected() {
        let s = Scenario::new(Profile::Step, 25.0, Mismatch::Nominal);
        let cfg = RunConfig {
            ts: 5000.0,
            duration_s: 1.5e6,
            ..Default::default()
        };
        for kind in ControllerKind::ALL {
            assert!(matches!(
                run_scenario(&s, kind, &cfg),
                Err(ConfigError::Unstable { .. })
            ));
        }
    }
}
