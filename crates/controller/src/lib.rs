//! Feedback controllers for the thermal twin: an incremental PID and a
//! constrained receding-horizon controller.

use serde::{Deserialize, Serialize};
use sim::ConfigResult;
use sim::error::{ensure_finite, ensure_non_negative, ensure_positive, ensure_range};

pub mod horizon;

pub use horizon::{HorizonConfig, HorizonController};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub umin: f64,
    pub umax: f64,
    /// Largest change of the output between two consecutive steps.
    pub du_max: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.9,
            ki: 0.03,
            kd: 0.08,
            umin: 0.0,
            umax: 1.0,
            du_max: 0.06,
        }
    }
}

impl PidConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        ensure_finite("kp", self.kp)?;
        ensure_finite("ki", self.ki)?;
        ensure_finite("kd", self.kd)?;
        ensure_range("control limits", self.umin, self.umax)?;
        ensure_non_negative("du_max", self.du_max)?;
        Ok(())
    }
}

/// Velocity-form PID. There is no integrator state to wind up: the output
/// itself accumulates the rate-limited increments and is then saturated.
#[derive(Clone, Debug)]
pub struct Pid {
    cfg: PidConfig,
    ts: f64,
    e1: f64,
    e2: f64,
    u: f64,
}

impl Pid {
    pub fn new(cfg: PidConfig, ts: f64) -> ConfigResult<Self> {
        cfg.validate()?;
        ensure_positive("sample interval", ts)?;
        Ok(Self {
            cfg,
            ts,
            e1: 0.0,
            e2: 0.0,
            u: 0.0_f64.clamp(cfg.umin, cfg.umax),
        })
    }

    /// Last applied output.
    pub fn output(&self) -> f64 {
        self.u
    }

    pub fn reset(&mut self) {
        self.e1 = 0.0;
        self.e2 = 0.0;
        self.u = 0.0_f64.clamp(self.cfg.umin, self.cfg.umax);
    }

    /// One controller step for setpoint `r` and measurement `y`.
    pub fn step(&mut self, r: f64, y: f64) -> f64 {
        let c = &self.cfg;
        let e = r - y;

        let du = c.kp * (e - self.e1)
            + c.ki * self.ts * e
            + c.kd * (e - 2.0 * self.e1 + self.e2) / self.ts;
        let du = du.clamp(-c.du_max, c.du_max);

        self.u = (self.u + du).clamp(c.umin, c.umax);
        self.e2 = self.e1;
        self.e1 = e;
        self.u
    }
}
