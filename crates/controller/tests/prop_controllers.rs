//! Constraint satisfaction of both controllers over arbitrary inputs.

use controller::{HorizonConfig, HorizonController, Pid, PidConfig};
use nalgebra::Vector2;
use proptest::prelude::*;
use sim::{DiscreteModel, PlantParameters};

const TOL: f64 = 1e-12;

fn limits() -> impl Strategy<Value = (f64, f64, f64)> {
    (-1.0f64..1.0, 0.0f64..2.0, 0.0f64..0.5).prop_map(|(lo, width, du)| (lo, lo + width, du))
}

proptest! {
    #[test]
    fn pid_respects_box_and_rate(
        (umin, umax, du_max) in limits(),
        kp in 0.0f64..5.0,
        ki in 0.0f64..1.0,
        kd in 0.0f64..1.0,
        samples in prop::collection::vec((0.0f64..100.0, 0.0f64..100.0), 1..100),
    ) {
        let cfg = PidConfig { kp, ki, kd, umin, umax, du_max };
        let mut pid = Pid::new(cfg, 1.0).unwrap();
        let mut prev = pid.output();
        for (r, y) in samples {
            let u = pid.step(r, y);
            prop_assert!(u >= umin && u <= umax, "u={} not in [{}, {}]", u, umin, umax);
            prop_assert!((u - prev).abs() <= du_max + TOL, "|{} - {}| > {}", u, prev, du_max);
            prev = u;
        }
    }

    #[test]
    fn horizon_respects_box_and_rate(
        (umin, umax, du_max) in limits(),
        n in 1usize..16,
        qy in 0.0f64..5.0,
        qdu in 0.0f64..1.0,
        room in 0.0f64..100.0,
        sample in 0.0f64..100.0,
        reference in 0.0f64..100.0,
        ambient in -10.0f64..40.0,
        prev_frac in 0.0f64..=1.0,
    ) {
        let model = DiscreteModel::discretize(&PlantParameters::default(), 1.0).unwrap();
        let cfg = HorizonConfig { horizon: n, qy, qdu, umin, umax, du_max, ..Default::default() };
        let ctl = HorizonController::new(model, cfg).unwrap();

        let u_prev = umin + prev_frac * (umax - umin);
        let r_seq = vec![reference; n];
        let u = ctl.control(&Vector2::new(room, sample), &r_seq, u_prev, ambient);

        prop_assert!(u >= umin - TOL && u <= umax + TOL, "u={} not in [{}, {}]", u, umin, umax);
        prop_assert!((u - u_prev).abs() <= du_max + TOL, "|{} - {}| > {}", u, u_prev, du_max);
    }

    /// Chained calls: every action stays within du_max of the one before.
    #[test]
    fn horizon_rate_limit_holds_in_closed_loop(
        references in prop::collection::vec(20.0f64..70.0, 1..40),
    ) {
        let model = DiscreteModel::discretize(&PlantParameters::default(), 1.0).unwrap();
        let cfg = HorizonConfig::default();
        let ctl = HorizonController::new(model, cfg).unwrap();

        let mut x = Vector2::new(25.0, 25.0);
        let mut u_prev = 0.0;
        for r in references {
            let u = ctl.control(&x, &[r; 8], u_prev, 25.0);
            prop_assert!((u - u_prev).abs() <= cfg.du_max + TOL);
            prop_assert!((cfg.umin..=cfg.umax).contains(&u));
            x = model.advance(&x, u, 25.0);
            u_prev = u;
        }
    }
}
