//! Scenario layer of the thermal twin: reference profiles, the closed-loop
//! runner, performance metrics and the cross-product experiment grid.

pub mod config;
pub mod grid;
pub mod metrics;
pub mod profile;
pub mod runner;

pub use config::RunConfig;
pub use grid::{ExperimentGrid, Record, Spread, SummaryRow, WinRow, median_iqr, run_grid, wins_table};
pub use metrics::{Metric, Metrics};
pub use profile::{Profile, ProfileConfig};
pub use runner::{ControllerKind, RunOutput, Scenario, Trajectory, run_scenario};
