//! Cross-product experiments and their aggregation.
//!
//! Runs are independent: each owns its estimator, controller, plant and
//! seeded sensor, so the grid is executed on the rayon pool without any
//! shared state. Aggregation only happens over the finished records.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sim::{ConfigResult, Mismatch};

use crate::config::RunConfig;
use crate::metrics::{Metric, Metrics};
use crate::profile::Profile;
use crate::runner::{ControllerKind, Scenario, run_scenario};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentGrid {
    pub profiles: Vec<Profile>,
    pub ambients: Vec<f64>,
    pub mismatches: Vec<Mismatch>,
}

impl Default for ExperimentGrid {
    fn default() -> Self {
        Self {
            profiles: Profile::ALL.to_vec(),
            ambients: vec![20.0, 25.0, 30.0],
            mismatches: Mismatch::ALL.to_vec(),
        }
    }
}

impl ExperimentGrid {
    /// Profile-major cross product.
    pub fn scenarios(&self) -> Vec<Scenario> {
        let mut out =
            Vec::with_capacity(self.profiles.len() * self.ambients.len() * self.mismatches.len());
        for &profile in &self.profiles {
            for &ambient in &self.ambients {
                for &mismatch in &self.mismatches {
                    out.push(Scenario::new(profile, ambient, mismatch));
                }
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub scenario: String,
    pub profile: Profile,
    pub controller: ControllerKind,
    pub metrics: Metrics,
}

/// Run both controllers on every scenario of `grid`.
///
/// Records come back in grid order, PID before MPC, identical to a
/// sequential execution.
pub fn run_grid(grid: &ExperimentGrid, cfg: &RunConfig) -> ConfigResult<Vec<Record>> {
    cfg.validate()?;
    let scenarios = grid.scenarios();
    let total = scenarios.len();
    tracing::info!(
        scenarios = total,
        duration_s = cfg.duration_s,
        horizon = cfg.horizon.horizon,
        "running experiment grid"
    );

    let per_scenario: Vec<Vec<Record>> = scenarios
        .par_iter()
        .enumerate()
        .map(|(i, scn)| -> ConfigResult<Vec<Record>> {
            let records = ControllerKind::ALL
                .iter()
                .map(|&kind| {
                    run_scenario(scn, kind, cfg).map(|out| Record {
                        scenario: scn.name.clone(),
                        profile: scn.profile,
                        controller: kind,
                        metrics: out.metrics,
                    })
                })
                .collect::<ConfigResult<Vec<_>>>()?;
            tracing::info!(done = i + 1, total, scenario = %scn.name, "scenario complete");
            Ok(records)
        })
        .collect::<ConfigResult<_>>()?;

    Ok(per_scenario.into_iter().flatten().collect())
}

/// MPC against PID on one metric, lower is better.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRow {
    pub metric: Metric,
    pub mpc_wins: usize,
    pub ties: usize,
    pub mpc_losses: usize,
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Win/tie/loss counts per metric over scenarios that have both controllers.
pub fn wins_table(records: &[Record]) -> Vec<WinRow> {
    let mut pairs: HashMap<&str, (Option<&Metrics>, Option<&Metrics>)> = HashMap::new();
    for rec in records {
        let slot = pairs.entry(rec.scenario.as_str()).or_default();
        match rec.controller {
            ControllerKind::Pid => slot.0 = Some(&rec.metrics),
            ControllerKind::Mpc => slot.1 = Some(&rec.metrics),
        }
    }

    Metric::ALL
        .iter()
        .map(|&metric| {
            let mut row = WinRow {
                metric,
                mpc_wins: 0,
                ties: 0,
                mpc_losses: 0,
            };
            for (pid, mpc) in pairs.values().filter_map(|&(p, m)| p.zip(m)) {
                let (p, m) = (pid.value(metric), mpc.value(metric));
                if is_close(m, p) {
                    row.ties += 1;
                } else if m < p {
                    row.mpc_wins += 1;
                } else {
                    row.mpc_losses += 1;
                }
            }
            row
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub metric: Metric,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// `None` when grouped over all profiles.
    pub profile: Option<Profile>,
    pub controller: ControllerKind,
    pub runs: usize,
    pub spreads: Vec<Spread>,
}

/// Median and interquartile range of every metric per controller, and per
/// profile as well when `by_profile` is set.
pub fn median_iqr(records: &[Record], by_profile: bool) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(Option<Profile>, ControllerKind), Vec<&Metrics>> = BTreeMap::new();
    for rec in records {
        let profile = by_profile.then_some(rec.profile);
        groups
            .entry((profile, rec.controller))
            .or_default()
            .push(&rec.metrics);
    }

    groups
        .into_iter()
        .map(|((profile, controller), members)| {
            let spreads = Metric::ALL
                .iter()
                .map(|&metric| {
                    let mut values: Vec<f64> = members.iter().map(|m| m.value(metric)).collect();
                    values.sort_by(f64::total_cmp);
                    Spread {
                        metric,
                        median: quantile(&values, 0.5),
                        q1: quantile(&values, 0.25),
                        q3: quantile(&values, 0.75),
                    }
                })
                .collect();
            SummaryRow {
                profile,
                controller,
                runs: members.len(),
                spreads,
            }
        })
        .collect()
}

/// Linear interpolation between order statistics of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}
