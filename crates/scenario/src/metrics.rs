//! Scalar performance indicators of a finished closed-loop run.

use serde::{Deserialize, Serialize};

use crate::runner::Trajectory;

/// Guards the overshoot ratio against a near-zero reference change.
const OVERSHOOT_EPS: f64 = 1e-6;
/// Settling band, relative to the final reference.
const SETTLING_BAND: f64 = 0.02;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Sum of |r - y|.
    #[serde(rename = "IAE")]
    pub iae: f64,
    /// Sum of (r - y)^2.
    #[serde(rename = "ISE")]
    pub ise: f64,
    #[serde(rename = "Overshoot_%")]
    pub overshoot_pct: f64,
    #[serde(rename = "Settling_s")]
    pub settling_s: f64,
    /// Sum of u^2.
    #[serde(rename = "Energy_sum_u2")]
    pub energy_sum_u2: f64,
    /// Time spent above the upper temperature bound.
    #[serde(rename = "Violation_s")]
    pub violation_s: f64,
}

/// Names one field of [`Metrics`]; all of them are "lower is better".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "IAE")]
    Iae,
    #[serde(rename = "ISE")]
    Ise,
    #[serde(rename = "Overshoot_%")]
    Overshoot,
    #[serde(rename = "Settling_s")]
    Settling,
    #[serde(rename = "Energy_sum_u2")]
    Energy,
    #[serde(rename = "Violation_s")]
    Violation,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Iae,
        Metric::Ise,
        Metric::Overshoot,
        Metric::Settling,
        Metric::Energy,
        Metric::Violation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Iae => "IAE",
            Metric::Ise => "ISE",
            Metric::Overshoot => "Overshoot_%",
            Metric::Settling => "Settling_s",
            Metric::Energy => "Energy_sum_u2",
            Metric::Violation => "Violation_s",
        }
    }
}

impl Metrics {
    /// Score `traj` against its own reference.
    ///
    /// Overshoot and settling are measured against the *last* reference
    /// sample, which assumes a single step-like target change. For the
    /// multistep profile they describe only the final leg.
    pub fn compute(traj: &Trajectory, upper_bound: Option<f64>) -> Self {
        let (y, r, u) = (&traj.y, &traj.r, &traj.u);
        let (Some(&y0), Some(&r_final)) = (y.first(), r.last()) else {
            return Self::default();
        };
        let ts = traj.ts;

        let errors = r.iter().zip(y).map(|(r, y)| r - y);
        let (iae, ise) = errors.fold((0.0, 0.0), |(a, s), e| (a + e.abs(), s + e * e));

        let y_max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let overshoot_pct =
            (y_max - r_final).max(0.0) / (r_final - y0).abs().max(OVERSHOOT_EPS) * 100.0;

        let band = SETTLING_BAND * r_final.abs().max(1.0);
        // one past the last sample outside the band
        let settled_from = y
            .iter()
            .rposition(|v| (v - r_final).abs() > band)
            .map_or(0, |k| k + 1);
        let settling_s = settled_from as f64 * ts;

        let energy_sum_u2: f64 = u.iter().map(|u| u * u).sum();

        let violation_s = upper_bound.map_or(0.0, |bound| {
            y.iter().filter(|&&v| v > bound).count() as f64 * ts
        });

        Self {
            iae,
            ise,
            overshoot_pct,
            settling_s,
            energy_sum_u2,
            violation_s,
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Iae => self.iae,
            Metric::Ise => self.ise,
            Metric::Overshoot => self.overshoot_pct,
            Metric::Settling => self.settling_s,
            Metric::Energy => self.energy_sum_u2,
            Metric::Violation => self.violation_s,
        }
    }
}
