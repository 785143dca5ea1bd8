//! Receding-horizon controller solved approximately by projected gradient.
//!
//! Each call predicts the room temperature `N` steps ahead, runs a fixed
//! number of gradient steps on
//!
//! ```text
//! J(U) = qy * |y_free + G U - r|^2 + qdu * |dU|^2,   dU[0] = U[0] - u_prev
//! ```
//!
//! projecting onto the box and rate limits after every step, and returns the
//! first element of `U`. The iteration budget is deliberately small; this is
//! not an exact QP solve and the constraints hold only through projection.

use nalgebra::{DMatrix, DVector, Vector2};
use serde::{Deserialize, Serialize};
use sim::error::{ConfigError, ensure_finite, ensure_non_negative, ensure_positive, ensure_range};
use sim::{ConfigResult, DiscreteModel};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    /// Prediction horizon `N` (samples).
    pub horizon: usize,
    /// Tracking weight.
    pub qy: f64,
    /// Control move weight.
    pub qdu: f64,
    pub umin: f64,
    pub umax: f64,
    pub du_max: f64,
    /// Ambient forecast used for the free response. `None` means "the
    /// scenario's ambient temperature".
    pub ambient_forecast: Option<f64>,
    pub max_iter: usize,
    /// Fixed gradient step length.
    pub step: f64,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            horizon: 8,
            qy: 1.0,
            qdu: 0.08,
            umin: 0.0,
            umax: 1.0,
            du_max: 0.06,
            ambient_forecast: None,
            max_iter: 6,
            step: 0.08,
        }
    }
}

impl HorizonConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.horizon < 1 {
            return Err(ConfigError::InvalidArg {
                what: "horizon length must be at least 1",
            });
        }
        if self.max_iter < 1 {
            return Err(ConfigError::InvalidArg {
                what: "max_iter must be at least 1",
            });
        }
        ensure_non_negative("qy", self.qy)?;
        ensure_non_negative("qdu", self.qdu)?;
        ensure_range("control limits", self.umin, self.umax)?;
        ensure_non_negative("du_max", self.du_max)?;
        ensure_positive("gradient step", self.step)?;
        if let Some(ta) = self.ambient_forecast {
            ensure_finite("ambient forecast", ta)?;
        }
        Ok(())
    }
}

/// Prediction matrices for one model and horizon, built once per run.
///
/// [`HorizonController::control`] borrows `self` immutably and has no side
/// effects, so a single controller can be shared across threads.
#[derive(Clone, Debug)]
pub struct HorizonController {
    cfg: HorizonConfig,
    model: DiscreteModel,
    /// Lower-triangular Toeplitz map from control sequence to outputs,
    /// `G[k, i] = C Ad^(k-i) Bd` for `i <= k`.
    g: DMatrix<f64>,
}

impl HorizonController {
    pub fn new(model: DiscreteModel, cfg: HorizonConfig) -> ConfigResult<Self> {
        cfg.validate()?;
        let n = cfg.horizon;
        let markov = model.markov_parameters(n);
        let g = DMatrix::from_fn(n, n, |k, i| if i <= k { markov[k - i] } else { 0.0 });
        Ok(Self { cfg, model, g })
    }

    pub fn prediction_matrix(&self) -> &DMatrix<f64> {
        &self.g
    }

    /// Output trajectory from `x` under the ambient forecast alone.
    pub fn free_response(&self, x: &Vector2<f64>, ambient_c: f64) -> DVector<f64> {
        let mut x = *x;
        DVector::from_fn(self.cfg.horizon, |_, _| {
            x = self.model.advance(&x, 0.0, ambient_c);
            self.model.output(&x)
        })
    }

    /// Control action for estimate `x_est`, reference sequence `r_seq`
    /// (length `N`) and previously applied control `u_prev`.
    ///
    /// `ambient_c` is used when the config carries no forecast of its own.
    ///
    /// # Panics
    ///
    /// If `r_seq` does not have exactly `N` elements.
    pub fn control(&self, x_est: &Vector2<f64>, r_seq: &[f64], u_prev: f64, ambient_c: f64) -> f64 {
        let c = &self.cfg;
        let n = c.horizon;
        assert_eq!(r_seq.len(), n, "reference sequence must span the horizon");

        let forecast = c.ambient_forecast.unwrap_or(ambient_c);
        let y_free = self.free_response(x_est, forecast);
        let r = DVector::from_column_slice(r_seq);

        let mut u = DVector::from_element(n, u_prev);
        for _ in 0..c.max_iter {
            let e = &y_free + &self.g * &u - &r;
            let du = first_difference(&u, u_prev);

            // d/dU |dU|^2: dU[j] appears in its own term and, negated, in dU[j + 1]
            let move_grad = DVector::from_fn(n, |j, _| {
                let next = if j + 1 < n { du[j + 1] } else { 0.0 };
                du[j] - next
            });
            let grad = self.g.tr_mul(&e) * (2.0 * c.qy) + move_grad * (2.0 * c.qdu);

            u -= grad * c.step;
            self.project(&mut u, u_prev);
        }
        u[0]
    }

    /// Clamp to the box, then walk forward clamping each move relative to the
    /// already-projected predecessor.
    fn project(&self, u: &mut DVector<f64>, u_prev: f64) {
        let c = &self.cfg;
        let mut prev = u_prev;
        for v in u.iter_mut() {
            let boxed = v.clamp(c.umin, c.umax);
            *v = boxed.clamp(prev - c.du_max, prev + c.du_max);
            prev = *v;
        }
    }
}

fn first_difference(u: &DVector<f64>, anchor: f64) -> DVector<f64> {
    let mut prev = anchor;
    u.map(|v| {
        let d = v - prev;
        prev = v;
        d
    })
}
