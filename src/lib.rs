//! Thermal digital twin: PID against a constrained receding-horizon
//! controller on a two-node room/sample plant.
//!
//! Re-exports the member crates so integration tests and downstream
//! reporting tools need a single dependency:
//! - [`sim`]: plant parameters, model factory, true plant, noisy sensor
//! - [`estimator`]: Kalman filter
//! - [`controller`]: incremental PID and horizon controller
//! - [`scenario`]: profiles, closed-loop runner, metrics, experiment grid

pub use controller::*;
pub use estimator::*;
pub use scenario::*;
pub use sim::*;
