//! Two-node (room/sample) thermal network and its forward-Euler discretization.
//!
//! Continuous model, state `x = [T_room, T_sample]`:
//!
//! ```text
//! Cr dTr/dt = (Ta - Tr)/Rra + (Ts - Tr)/Rrs + alpha*u
//! Cs dTs/dt = (Tr - Ts)/Rrs
//! ```
//!
//! Only the room node is measured and only the room node is heated.

use nalgebra::{Matrix2, RowVector2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigResult, ensure_positive};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParameters {
    /// Room heat capacitance.
    pub cr: f64,
    /// Sample heat capacitance.
    pub cs: f64,
    /// Room <-> sample thermal resistance.
    pub rrs: f64,
    /// Room <-> ambient thermal resistance.
    pub rra: f64,
    /// Actuator gain (heat per unit of control).
    pub alpha: f64,
}

impl Default for PlantParameters {
    fn default() -> Self {
        Self {
            cr: 1500.0,
            cs: 300.0,
            rrs: 1.2,
            rra: 4.0,
            alpha: 50.0,
        }
    }
}

/// How far the "true" plant deviates from the nominal model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mismatch {
    Nominal,
    Minus20,
    Plus20,
}

impl Mismatch {
    pub const ALL: [Mismatch; 3] = [Mismatch::Nominal, Mismatch::Minus20, Mismatch::Plus20];

    pub fn factor(self) -> f64 {
        match self {
            Mismatch::Nominal => 1.0,
            Mismatch::Minus20 => 0.8,
            Mismatch::Plus20 => 1.2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mismatch::Nominal => "nominal",
            Mismatch::Minus20 => "minus20",
            Mismatch::Plus20 => "plus20",
        }
    }
}

impl PlantParameters {
    pub fn validate(&self) -> ConfigResult<()> {
        ensure_positive("Cr", self.cr)?;
        ensure_positive("Cs", self.cs)?;
        ensure_positive("Rrs", self.rrs)?;
        ensure_positive("Rra", self.rra)?;
        ensure_positive("alpha", self.alpha)?;
        Ok(())
    }

    /// Parameters of the perturbed plant. The thermal network is scaled,
    /// the actuator gain is not.
    pub fn scaled(&self, mismatch: Mismatch) -> Self {
        let f = mismatch.factor();
        Self {
            cr: self.cr * f,
            cs: self.cs * f,
            rrs: self.rrs * f,
            rra: self.rra * f,
            alpha: self.alpha,
        }
    }

    /// Continuous-time state matrix A.
    pub fn state_matrix(&self) -> Matrix2<f64> {
        let room_sample = 1.0 / (self.cr * self.rrs);
        let room_ambient = 1.0 / (self.cr * self.rra);
        let sample_room = 1.0 / (self.cs * self.rrs);
        Matrix2::new(
            -(room_ambient + room_sample),
            room_sample,
            sample_room,
            -sample_room,
        )
    }

    /// Largest sample interval for which every eigenvalue of `I + Ts*A`
    /// stays inside the closed unit disc: `2 / max|lambda(A)|`.
    pub fn euler_stability_limit(&self) -> f64 {
        let a = self.state_matrix();
        let half_trace = 0.5 * a.trace();
        let disc = half_trace * half_trace - a.determinant();
        // RC networks have real, negative eigenvalues.
        let fastest = if disc >= 0.0 {
            (half_trace - disc.sqrt()).abs()
        } else {
            a.determinant().sqrt()
        };
        2.0 / fastest
    }
}

/// `x[k+1] = Ad x[k] + Bd u[k] + Ed Ta[k]`, `y[k] = C x[k]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscreteModel {
    pub ad: Matrix2<f64>,
    pub bd: Vector2<f64>,
    pub ed: Vector2<f64>,
    pub c: RowVector2<f64>,
    pub ts: f64,
}

impl DiscreteModel {
    /// Forward-Euler discretization: `Ad = I + Ts*A`, `Bd = Ts*B`, `Ed = Ts*E`.
    ///
    /// This is a first-order approximation; the result is only stable for
    /// `ts <= params.euler_stability_limit()`. A model past that limit is
    /// still returned, with a warning.
    pub fn discretize(params: &PlantParameters, ts: f64) -> ConfigResult<Self> {
        ensure_positive("sample interval", ts)?;
        params.validate()?;

        let a = params.state_matrix();
        let b = Vector2::new(params.alpha / params.cr, 0.0);
        let e = Vector2::new(1.0 / (params.cr * params.rra), 0.0);

        let model = Self {
            ad: Matrix2::identity() + a * ts,
            bd: b * ts,
            ed: e * ts,
            c: RowVector2::new(1.0, 0.0),
            ts,
        };

        let rho = model.spectral_radius();
        if rho > 1.0 {
            tracing::warn!(
                ts,
                spectral_radius = rho,
                limit = params.euler_stability_limit(),
                "sample interval exceeds the forward-Euler stability limit"
            );
        }
        Ok(model)
    }

    /// `y = C x`
    pub fn output(&self, x: &Vector2<f64>) -> f64 {
        (self.c * x)[(0, 0)]
    }

    /// One step of the state recursion.
    pub fn advance(&self, x: &Vector2<f64>, u: f64, ambient: f64) -> Vector2<f64> {
        self.ad * x + self.bd * u + self.ed * ambient
    }

    /// Impulse response samples `C Ad^d Bd` for `d = 0..n`.
    pub fn markov_parameters(&self, n: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(n);
        let mut v = self.bd;
        for _ in 0..n {
            out.push(self.output(&v));
            v = self.ad * v;
        }
        out
    }

    /// Largest eigenvalue magnitude of `Ad`.
    pub fn spectral_radius(&self) -> f64 {
        spectral_radius_2x2(&self.ad)
    }
}

fn spectral_radius_2x2(m: &Matrix2<f64>) -> f64 {
    let half_trace = 0.5 * m.trace();
    let det = m.determinant();
    let disc = half_trace * half_trace - det;
    if disc >= 0.0 {
        let root = disc.sqrt();
        (half_trace + root).abs().max((half_trace - root).abs())
    } else {
        // complex pair, |lambda|^2 = det
        det.sqrt()
    }
}
