use thermal_twin as tt;

// The default room takes hours to reach 60 °C and default sensor noise keeps
// PID outside the 2% band, so these runs use this plant with σ = 0.02.

/// A small, fast room (time constant ~2 min) that can reach 60 °C within
/// five minutes at a moderate duty cycle.
fn fast_room() -> tt::PlantParameters {
    tt::PlantParameters {
        cr: 60.0,
        cs: 20.0,
        rrs: 1.0,
        rra: 2.0,
        alpha: 30.0,
    }
}

fn step_config() -> tt::RunConfig {
    tt::RunConfig {
        ts: 1.0,
        duration_s: 300.0,
        noise_std: 0.02,
        initial_temp: 25.0,
        plant: fast_room(),
        pid: tt::PidConfig {
            kp: 0.9,
            ki: 0.03,
            kd: 0.08,
            du_max: 0.06,
            ..Default::default()
        },
        horizon: tt::HorizonConfig {
            horizon: 8,
            qy: 1.0,
            qdu: 0.08,
            ..Default::default()
        },
        profile: tt::ProfileConfig {
            target: 60.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn step_scenario() -> tt::Scenario {
    tt::Scenario::new(tt::Profile::Step, 25.0, tt::Mismatch::Nominal)
}

fn assert_tail_settled(traj: &tt::Trajectory, target: f64) {
    let band = 0.02 * target;
    let tail = &traj.y[traj.len() - 50..];
    for (k, y) in tail.iter().enumerate() {
        assert!(
            (y - target).abs() <= band,
            "sample {} of the last 50 is {y}, outside {target} ± {band}",
            k
        );
    }
}

#[test]
fn pid_settles_on_step() {
    let out = tt::run_scenario(&step_scenario(), tt::ControllerKind::Pid, &step_config()).unwrap();
    let traj = &out.trajectory;
    assert_eq!(traj.len(), 300);
    assert_tail_settled(traj, 60.0);

    let m = out.metrics;
    assert!(m.energy_sum_u2.is_finite());
    assert!(m.energy_sum_u2 > 0.0);
    assert!(m.energy_sum_u2 < 300.0);
    assert!(m.settling_s < 300.0);
    assert!(traj.u.iter().all(|u| (0.0..=1.0).contains(u)));
}

#[test]
fn horizon_controller_settles_on_step() {
    let out = tt::run_scenario(&step_scenario(), tt::ControllerKind::Mpc, &step_config()).unwrap();
    assert_tail_settled(&out.trajectory, 60.0);
    assert!(out.metrics.settling_s < 300.0);
}

#[test]
fn controllers_take_different_paths() {
    let cfg = step_config();
    let pid = tt::run_scenario(&step_scenario(), tt::ControllerKind::Pid, &cfg).unwrap();
    let mpc = tt::run_scenario(&step_scenario(), tt::ControllerKind::Mpc, &cfg).unwrap();
    assert_ne!(pid.metrics, mpc.metrics);
    assert_ne!(pid.trajectory.u, mpc.trajectory.u);
    // same seed, same scenario: the first measurement is shared
    assert_eq!(pid.trajectory.y_measured[0], mpc.trajectory.y_measured[0]);
}

#[test]
fn identical_inputs_are_bit_identical() {
    let cfg = tt::RunConfig::default();
    let scn = tt::Scenario::new(tt::Profile::Multistep, 30.0, tt::Mismatch::Plus20);
    for kind in tt::ControllerKind::ALL {
        let a = tt::run_scenario(&scn, kind, &cfg).unwrap();
        let b = tt::run_scenario(&scn, kind, &cfg).unwrap();
        assert_eq!(a.trajectory, b.trajectory);
        assert_eq!(a.metrics, b.metrics);
    }

    let reseeded = tt::RunConfig { seed: 43, ..cfg.clone() };
    let a = tt::run_scenario(&scn, tt::ControllerKind::Pid, &cfg).unwrap();
    let c = tt::run_scenario(&scn, tt::ControllerKind::Pid, &reseeded).unwrap();
    assert_ne!(a.trajectory.y_measured, c.trajectory.y_measured);
}

#[test]
fn every_reference_scenario_produces_numeric_metrics() {
    let cfg = tt::RunConfig::default();
    for scn in tt::ExperimentGrid::default().scenarios() {
        for kind in tt::ControllerKind::ALL {
            let out = tt::run_scenario(&scn, kind, &cfg).unwrap();
            let m = out.metrics;
            for metric in tt::Metric::ALL {
                let v = m.value(metric);
                assert!(v.is_finite() && v >= 0.0, "{} {:?}: {} = {v}", scn.name, kind, metric.label());
            }
            assert_eq!(out.trajectory.len(), cfg.steps());
        }
    }
}

#[test]
fn mismatched_plant_is_simulated_separately() {
    let cfg = step_config();
    let nominal = tt::run_scenario(&step_scenario(), tt::ControllerKind::Mpc, &cfg).unwrap();
    let minus = tt::run_scenario(
        &tt::Scenario::new(tt::Profile::Step, 25.0, tt::Mismatch::Minus20),
        tt::ControllerKind::Mpc,
        &cfg,
    )
    .unwrap();
    assert_ne!(nominal.trajectory.y, minus.trajectory.y);
    // the nominal config itself is never mutated by the mismatch
    assert_eq!(cfg.plant, fast_room());
}

#[test]
fn grid_summary_covers_both_controllers() {
    let grid = tt::ExperimentGrid {
        profiles: vec![tt::Profile::Step, tt::Profile::Ramp],
        ambients: vec![20.0, 30.0],
        mismatches: vec![tt::Mismatch::Nominal],
    };
    let cfg = tt::RunConfig {
        duration_s: 60.0,
        ..Default::default()
    };
    let records = tt::run_grid(&grid, &cfg).unwrap();
    assert_eq!(records.len(), 8);

    let wins = tt::wins_table(&records);
    for row in &wins {
        assert_eq!(row.mpc_wins + row.ties + row.mpc_losses, 4);
    }

    let summary = tt::median_iqr(&records, true);
    assert_eq!(summary.len(), 4);
    for row in summary {
        for spread in row.spreads {
            assert!(spread.q1 <= spread.median && spread.median <= spread.q3);
        }
    }
}
