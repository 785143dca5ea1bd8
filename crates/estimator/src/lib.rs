//! Linear Kalman filter over the two-node thermal model with a single room
//! temperature measurement.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use sim::error::{ensure_finite, ensure_non_negative, ensure_positive};
use sim::{ConfigResult, DiscreteModel};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Process noise covariance is `q_scale * I`.
    pub q_scale: f64,
    /// Measurement noise variance. `None` uses the sensor's noise variance.
    pub r_var: Option<f64>,
    /// Initial covariance is `p0_scale * I`.
    pub p0_scale: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            q_scale: 1e-4,
            r_var: None,
            p0_scale: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Estimator {
    model: DiscreteModel,
    x: Vector2<f64>,
    p: Matrix2<f64>,
    q: Matrix2<f64>,
    r: f64,
}

impl Estimator {
    /// `r_var` must be strictly positive; it keeps the innovation variance
    /// invertible.
    pub fn new(
        model: DiscreteModel,
        x0: Vector2<f64>,
        p0: Matrix2<f64>,
        q: Matrix2<f64>,
        r_var: f64,
    ) -> ConfigResult<Self> {
        ensure_positive("measurement variance", r_var)?;
        ensure_finite("initial room estimate", x0[0])?;
        ensure_finite("initial sample estimate", x0[1])?;
        for i in 0..2 {
            ensure_non_negative("process noise diagonal", q[(i, i)])?;
            ensure_non_negative("initial covariance diagonal", p0[(i, i)])?;
        }
        Ok(Self {
            model,
            x: x0,
            p: p0,
            q,
            r: r_var,
        })
    }

    /// Filter built from `cfg`, starting with both nodes at `initial_c`.
    pub fn from_config(
        model: DiscreteModel,
        cfg: &EstimatorConfig,
        initial_c: f64,
        sensor_var: f64,
    ) -> ConfigResult<Self> {
        ensure_non_negative("process noise scale", cfg.q_scale)?;
        ensure_non_negative("initial covariance scale", cfg.p0_scale)?;
        Self::new(
            model,
            Vector2::new(initial_c, initial_c),
            Matrix2::identity() * cfg.p0_scale,
            Matrix2::identity() * cfg.q_scale,
            cfg.r_var.unwrap_or(sensor_var),
        )
    }

    /// Time update with the control actually applied and the ambient
    /// temperature over the interval.
    pub fn predict(&mut self, u: f64, ambient_c: f64) {
        let ad = &self.model.ad;
        self.x = self.model.advance(&self.x, u, ambient_c);
        self.p = ad * self.p * ad.transpose() + self.q;
    }

    /// Measurement update with room temperature `y`.
    pub fn update(&mut self, y: f64) {
        let c = &self.model.c;
        let pct = self.p * c.transpose();
        let s = (c * pct)[(0, 0)] + self.r;
        debug_assert!(s > 0.0, "innovation variance must be positive, got {s}");

        let k = pct / s;
        let innovation = y - self.model.output(&self.x);
        self.x += k * innovation;
        self.p = (Matrix2::identity() - k * c) * self.p;
        // (I - KC)P is symmetric in exact arithmetic only
        self.p = 0.5 * (self.p + self.p.transpose());
    }

    /// Posterior (after `update`) or prior (after `predict`) state estimate.
    pub fn state(&self) -> Vector2<f64> {
        self.x
    }

    pub fn covariance(&self) -> Matrix2<f64> {
        self.p
    }
}
