//! Norwood - Single-Ventricle Circulation Solver
//!
//! Command-line front end for the lumped-parameter models.
//!
//! # Usage
//!
//! ```bash
//! norwood steady --ef 0.5
//! norwood --preset heart-failure compartment --drug vasopressin
//! norwood monte-carlo --realizations 1000 --seed 1 --drug phenylephrine
//! RUST_LOG=debug norwood simulate --extended --periods 5
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use norwood_core::{
    circuit::{
        DrugEffect, OxygenParams, ShuntCircuit, SteadyStateParams, StrokeVolumeClosure,
    },
    components::AorticOutflow,
    error::Result,
    solver::{
        simulate_extended, simulate_shunt, solve_compartment, solve_flow_pressure,
        solve_saturation, ExtendedModel, ExtendedState,
    },
    study::{
        grid_compartment, run_monte_carlo, sweep, sweep_all, CompartmentInput, MonteCarloConfig,
        SweepParameter, SweepPoint,
    },
    ModelConfig, NewtonRaphson, Preset,
};

/// Norwood circulation solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON model configuration (compartment inputs and compliances)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Clinical preset applied to the configuration's compliances
    #[arg(short, long, global = true, value_parser = parse_preset)]
    preset: Option<Preset>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Steady-state flows and pressures
    Steady(SteadyArgs),
    /// Steady state followed by the oxygen balance
    Oxygen {
        #[command(flatten)]
        steady: SteadyArgs,
        /// Hemoglobin (g/dL)
        #[arg(long, default_value_t = 15.0)]
        hb: f64,
        /// Oxygen consumption (mL O2/min)
        #[arg(long, default_value_t = 150.0)]
        cvo2: f64,
        /// Pulmonary venous saturation (fraction)
        #[arg(long, default_value_t = norwood_core::DEFAULT_PULMONARY_VENOUS_SATURATION)]
        s_pv: f64,
    },
    /// Multi-compartment flows, saturations and indices
    Compartment {
        #[arg(short, long, default_value = "baseline", value_parser = parse_drug)]
        drug: DrugEffect,
    },
    /// Monte Carlo study of patient variability
    MonteCarlo {
        #[arg(short = 'n', long, default_value_t = 1000)]
        realizations: usize,
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
        #[arg(short, long, default_value = "baseline", value_parser = parse_drug)]
        drug: DrugEffect,
    },
    /// Time-dependent simulation
    Simulate {
        /// Use the 14-state chamber and valve model
        #[arg(long)]
        extended: bool,
        /// Number of cardiac periods
        #[arg(long, default_value_t = 4.0)]
        periods: f64,
        /// Time step (min)
        #[arg(long, default_value_t = 1e-5)]
        dt: f64,
        /// Heart rate of the extended model (beats/min)
        #[arg(long, default_value_t = 130.0)]
        hr: f64,
        /// Print every n-th step
        #[arg(long, default_value_t = 50)]
        every: usize,
    },
    /// One-at-a-time sweeps of the steady-state and oxygen inputs
    Sweep {
        /// Input to sweep (C_sys, C_dia, C_A, C_V, HR, R_s, R_p, V_total, Hb, CVO2); all if omitted
        #[arg(value_parser = parse_sweep)]
        parameter: Option<SweepParameter>,
    },
    /// Two-input grid over the compartment model
    Grid {
        #[arg(value_parser = parse_input)]
        x: CompartmentInput,
        #[arg(value_parser = parse_input)]
        y: CompartmentInput,
        #[arg(short, long, default_value_t = 11)]
        n: usize,
    },
}

#[derive(clap::Args, Debug)]
struct SteadyArgs {
    /// Close with SV = EF·C_dia·P_v instead of the systolic compliance
    #[arg(long)]
    ef: Option<f64>,
    #[arg(long, default_value_t = 1.4)]
    c_sys: f64,
    #[arg(long, default_value_t = 6.0)]
    c_dia: f64,
    #[arg(long, default_value_t = 1.4)]
    c_a: f64,
    #[arg(long, default_value_t = 6.0)]
    c_v: f64,
    #[arg(long, default_value_t = 140.0)]
    hr: f64,
    #[arg(long, default_value_t = 7.74)]
    r_s: f64,
    #[arg(long, default_value_t = 0.34)]
    r_p: f64,
    #[arg(long, default_value_t = 420.0)]
    v_total: f64,
}

impl SteadyArgs {
    fn params(&self) -> SteadyStateParams {
        let closure = match self.ef {
            Some(ef) => StrokeVolumeClosure::EjectionFraction { ef },
            None => StrokeVolumeClosure::Compliance { c_sys: self.c_sys },
        };
        SteadyStateParams {
            c_dia: self.c_dia,
            c_a: self.c_a,
            c_v: self.c_v,
            heart_rate: self.hr,
            r_p: self.r_p,
            r_s: self.r_s,
            v_total: self.v_total,
            closure,
        }
    }
}

fn parse_preset(s: &str) -> std::result::Result<Preset, String> {
    Preset::from_str(s).ok_or_else(|| format!("unknown preset '{s}' (low-preload, lung-problem, heart-failure)"))
}

fn parse_drug(s: &str) -> std::result::Result<DrugEffect, String> {
    DrugEffect::from_str(s).ok_or_else(|| format!("unknown drug '{s}' (baseline, vasopressin, phenylephrine)"))
}

fn parse_sweep(s: &str) -> std::result::Result<SweepParameter, String> {
    SweepParameter::from_str(s).ok_or_else(|| format!("unknown sweep input '{s}'"))
}

fn parse_input(s: &str) -> std::result::Result<CompartmentInput, String> {
    CompartmentInput::from_str(s).ok_or_else(|| format!("unknown compartment input '{s}'"))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Load the configuration, then apply the preset's compliances
    let mut config = match &args.config {
        Some(path) => ModelConfig::from_json_file(path)?,
        None => ModelConfig::default(),
    };
    if let Some(preset) = args.preset {
        config.apply_preset(preset);
    }
    let solver = NewtonRaphson::new();

    match args.command {
        Command::Steady(steady) => {
            let s = solve_flow_pressure(&steady.params())?;
            print_row(&["Q_s", "Q_p", "Q_total", "Qp/Qs", "P_a", "P_v"]);
            print_values(&[s.q_s, s.q_p, s.q_total(), s.flow_ratio(), s.p_a, s.p_v]);
        }
        Command::Oxygen {
            steady,
            hb,
            cvo2,
            s_pv,
        } => {
            let s = solve_flow_pressure(&steady.params())?;
            let o = solve_saturation(s.q_s, s.q_p, &OxygenParams::new(hb, cvo2).with_pulmonary_venous_saturation(s_pv))?;
            print_row(&["Q_s", "Q_p", "P_a", "P_v", "S_m", "S_sv", "D20"]);
            print_values(&[s.q_s, s.q_p, s.p_a, s.p_v, o.s_m, o.s_sv, o.delivery]);
        }
        Command::Compartment { drug } => {
            let params = config.params.with_drug(drug);
            let s = solve_compartment(&params, &config.oxygen, &solver)?;
            let f = s.flows;
            println!("Compartment model ({:?})", drug);
            println!();
            print_row(&["Q_v", "Q_u", "Q_l", "Q_p", "P_sa", "P_pa", "P_pv"]);
            print_values(&[f.q_v, f.q_u, f.q_l, f.q_p, f.p_sa, f.p_pa, f.p_pv]);
            println!();
            let sat = s.saturations;
            print_row(&["S_pa", "S_pv", "S_svu", "S_svl", "OER", "TPG", "SVR", "PVR"]);
            print_values(&[
                sat.s_pa,
                sat.s_pv,
                sat.s_svu,
                sat.s_svl,
                s.oer,
                s.tpg(),
                params.clinical_svr(),
                params.clinical_pvr(),
            ]);
        }
        Command::MonteCarlo {
            realizations,
            seed,
            drug,
        } => {
            let mc = MonteCarloConfig::new()
                .with_realizations(realizations)
                .with_seed(seed)
                .with_drug(drug)
                .with_baseline(config.params, config.oxygen);
            let result = run_monte_carlo(&mc, &solver)?;
            println!("Monte Carlo results with {} realizations ({:?})", realizations, drug);
            println!();
            print_row(&["output", "mean", "std"]);
            for (output, summary) in result.summary()? {
                println!("{:>12}{:>12.3}{:>12.3}", output.label(), summary.mean, summary.std);
            }
        }
        Command::Simulate {
            extended,
            periods,
            dt,
            hr,
            every,
        } => {
            let every = every.max(1);
            if extended {
                let model = ExtendedModel::reference(hr)?;
                let tf = periods / hr;
                let series = simulate_extended(&model, ExtendedState::reference_initial(), 0.0, tf, dt)?;
                print_row(&["t", "p_a", "p_v", "Q_int", "Q_ext", "V_a", "V_v", "P_SA", "P_PA"]);
                for (t, s) in series.iter().step_by(every) {
                    print_values(&[t, s.p_a, s.p_v, s.q_int, s.q_ext, s.v_a, s.v_v, s.p_sa, s.p_pa]);
                }
            } else {
                let circuit = ShuntCircuit {
                    r_s: 20.0,
                    r_p: 2.0,
                    r_bts: 15.0,
                    c_s: 0.0005,
                    c_p: 0.0003,
                };
                let q_ao = AorticOutflow::default();
                let series = simulate_shunt(&circuit, 80.0, 20.0, &q_ao, periods * q_ao.period, dt)?;
                print_row(&["t", "Q_sa", "Q_sv", "Q_pa", "Q_pv", "P_sa", "P_sv", "P_pa", "P_pv"]);
                for (t, s) in series.iter().step_by(every) {
                    print_values(&[t, s.q_sa, s.q_sv, s.q_pa, s.q_pv, s.p_sa, s.p_sv, s.p_pa, s.p_pv]);
                }
            }
        }
        Command::Sweep { parameter } => {
            let steady = SteadyStateParams::default();
            let oxygen = OxygenParams::default();
            let sweeps = match parameter {
                Some(p) => vec![(p, sweep(p, &steady, &oxygen)?)],
                None => sweep_all(&steady, &oxygen)?,
            };
            for (p, points) in sweeps {
                print_sweep(p, &points);
            }
        }
        Command::Grid { x, y, n } => {
            let grid = grid_compartment(x, y, n, &config.params, &config.oxygen, &solver)?;
            println!("Q_p over {} (columns) x {} (rows)", x.label(), y.label());
            println!();
            print!("{:>12}", format!("{}\\{}", y.label(), x.label()));
            for xv in &grid.x {
                print!("{:>12.4}", xv);
            }
            println!();
            for (yv, row) in grid.y.iter().zip(grid.map(|s| s.flows.q_p)) {
                print!("{:>12.4}", yv);
                for cell in row {
                    match cell {
                        Some(v) => print!("{:>12.4}", v),
                        None => print!("{:>12}", "-"),
                    }
                }
                println!();
            }
        }
    }

    Ok(())
}

fn print_row(labels: &[&str]) {
    for label in labels {
        print!("{:>12}", label);
    }
    println!();
    println!("{}", "-".repeat(12 * labels.len()));
}

fn print_values(values: &[f64]) {
    for v in values {
        print!("{:>12.4}", v);
    }
    println!();
}

fn print_sweep(parameter: SweepParameter, points: &[SweepPoint]) {
    println!("Sweep of {}", parameter.label());
    print_row(&[parameter.label(), "Q_s", "Q_p", "Q_total", "P_a", "P_v", "S_m", "S_sv", "D20"]);
    for p in points {
        print_values(&[
            p.value,
            p.flow.q_s,
            p.flow.q_p,
            p.flow.q_total(),
            p.flow.p_a,
            p.flow.p_v,
            p.oxygen.s_m,
            p.oxygen.s_sv,
            p.oxygen.delivery,
        ]);
    }
    println!();
}
