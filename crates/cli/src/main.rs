use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use scenario::{
    ControllerKind, ExperimentGrid, Metrics, Profile, Record, RunConfig, Scenario, SummaryRow,
    WinRow, median_iqr, run_grid, run_scenario, wins_table,
};
use serde::Serialize;
use sim::Mismatch;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Step,
    Ramp,
    Multistep,
}

impl From<ProfileArg> for Profile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Step => Profile::Step,
            ProfileArg::Ramp => Profile::Ramp,
            ProfileArg::Multistep => Profile::Multistep,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MismatchArg {
    Nominal,
    Minus20,
    Plus20,
}

impl From<MismatchArg> for Mismatch {
    fn from(m: MismatchArg) -> Self {
        match m {
            MismatchArg::Nominal => Mismatch::Nominal,
            MismatchArg::Minus20 => Mismatch::Minus20,
            MismatchArg::Plus20 => Mismatch::Plus20,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ControllerArg {
    Pid,
    Mpc,
}

impl From<ControllerArg> for ControllerKind {
    fn from(c: ControllerArg) -> Self {
        match c {
            ControllerArg::Pid => ControllerKind::Pid,
            ControllerArg::Mpc => ControllerKind::Mpc,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "thermal-twin",
    version,
    about = "PID vs receding-horizon control of a two-node thermal plant"
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Command,
}

/// Settings shared by every subcommand. Flags override the config file.
#[derive(Args, Debug)]
struct RunArgs {
    /// JSON run configuration (missing fields take their defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Simulated time in seconds
    #[arg(long, global = true)]
    duration: Option<f64>,

    /// Sample interval in seconds
    #[arg(long, global = true)]
    ts: Option<f64>,

    /// Horizon length N of the MPC controller
    #[arg(long, global = true)]
    horizon: Option<usize>,

    /// RNG seed for the measurement noise
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Standard deviation of the room sensor noise (°C)
    #[arg(long, global = true)]
    noise_std: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scenario and print its per-sample trace as JSON lines
    Trace {
        #[arg(value_enum, long, default_value = "step")]
        profile: ProfileArg,

        /// Ambient temperature (°C)
        #[arg(long, default_value_t = 25.0)]
        ambient: f64,

        #[arg(value_enum, long, default_value = "nominal")]
        mismatch: MismatchArg,

        #[arg(value_enum, long, default_value = "pid")]
        controller: ControllerArg,
    },
    /// Run both controllers over a scenario grid and print metrics and comparisons
    Grid {
        #[arg(value_enum, long, num_args = 1.., default_values = ["step", "ramp", "multistep"])]
        profiles: Vec<ProfileArg>,

        #[arg(long, num_args = 1.., default_values_t = [20.0, 25.0, 30.0])]
        ambient: Vec<f64>,

        #[arg(value_enum, long, num_args = 1.., default_values = ["nominal", "minus20", "plus20"])]
        mismatch: Vec<MismatchArg>,
    },
}

#[derive(Serialize)]
struct TraceRow {
    t_s: f64,
    y: f64,
    y_measured: f64,
    r: f64,
    u: f64,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Metrics {
        scenario: &'a str,
        controller: ControllerKind,
        metrics: &'a Metrics,
    },
    Record(&'a Record),
    Wins(&'a WinRow),
    Summary(&'a SummaryRow),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.run)?;

    match cli.command {
        Command::Trace {
            profile,
            ambient,
            mismatch,
            controller,
        } => {
            let scn = Scenario::new(profile.into(), ambient, mismatch.into());
            trace(&scn, controller.into(), &cfg)
        }
        Command::Grid {
            profiles,
            ambient,
            mismatch,
        } => {
            let grid = ExperimentGrid {
                profiles: profiles.into_iter().map(Profile::from).collect(),
                ambients: ambient,
                mismatches: mismatch.into_iter().map(Mismatch::from).collect(),
            };
            grid_report(&grid, &cfg)
        }
    }
}

fn load_config(args: &RunArgs) -> Result<RunConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => RunConfig::default(),
    };

    if let Some(d) = args.duration {
        cfg.duration_s = d;
    }
    if let Some(ts) = args.ts {
        cfg.ts = ts;
    }
    if let Some(n) = args.horizon {
        cfg.horizon.horizon = n;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(sigma) = args.noise_std {
        cfg.noise_std = sigma;
    }
    cfg.validate().context("invalid run configuration")?;
    Ok(cfg)
}

fn trace(scn: &Scenario, kind: ControllerKind, cfg: &RunConfig) -> Result<()> {
    let out = run_scenario(scn, kind, cfg)?;
    let t = &out.trajectory;

    for k in 0..t.len() {
        let row = TraceRow {
            t_s: t.time(k),
            y: t.y[k],
            y_measured: t.y_measured[k],
            r: t.r[k],
            u: t.u[k],
        };
        println!("{}", serde_json::to_string(&row)?);
    }

    let summary = Line::Metrics {
        scenario: &scn.name,
        controller: kind,
        metrics: &out.metrics,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn grid_report(grid: &ExperimentGrid, cfg: &RunConfig) -> Result<()> {
    let started = std::time::Instant::now();
    let records = run_grid(grid, cfg)?;

    for rec in &records {
        println!("{}", serde_json::to_string(&Line::Record(rec))?);
    }
    for row in &wins_table(&records) {
        println!("{}", serde_json::to_string(&Line::Wins(row))?);
    }
    for by_profile in [false, true] {
        for row in &median_iqr(&records, by_profile) {
            println!("{}", serde_json::to_string(&Line::Summary(row))?);
        }
    }

    tracing::info!(
        runs = records.len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "grid complete"
    );
    Ok(())
}
