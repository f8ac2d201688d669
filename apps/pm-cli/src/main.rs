use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use pm_core::{timing, units};
use pm_machine::{DerivedSeries, RunSummary};
use pm_project::{IntegratorDef, ProjectError, ScenarioDef, compile_scenario};
use pm_sim::{ScenarioOutput, SimError, SimProgress, SimStats, run_scenario_with_progress};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pm-cli")]
#[command(about = "PMSM generator bench - hub-driven machine charging a battery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario (the reference bench if no file is given)
    Run {
        /// Path to a scenario YAML or JSON file
        scenario_path: Option<PathBuf>,
        /// End time in seconds
        #[arg(long)]
        t_end: Option<f64>,
        /// Maximum (or fixed) step in seconds
        #[arg(long)]
        max_step: Option<f64>,
        /// Integration method
        #[arg(long, value_enum)]
        integrator: Option<IntegratorArg>,
        /// Write time series as CSV to stdout
        #[arg(long, conflicts_with = "json")]
        series: bool,
        /// Write the run summary as JSON to stdout
        #[arg(long)]
        json: bool,
        /// Report wall-clock solve time
        #[arg(long)]
        timing: bool,
    },
    /// Validate a scenario file
    Validate {
        /// Path to a scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Print the reference scenario as YAML
    Defaults,
}

#[derive(Clone, Copy, ValueEnum)]
enum IntegratorArg {
    Dp45,
    Rk4,
    Euler,
}

impl From<IntegratorArg> for IntegratorDef {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::Dp45 => IntegratorDef::DormandPrince45,
            IntegratorArg::Rk4 => IntegratorDef::RK4,
            IntegratorArg::Euler => IntegratorDef::ForwardEuler,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Run produced no samples")]
    EmptyRun,
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario_path,
            t_end,
            max_step,
            integrator,
            series,
            json,
            timing,
        } => {
            let mut def = load_or_default(scenario_path.as_deref())?;
            if let Some(t_end) = t_end {
                def.solver.t_end_s = t_end;
            }
            if let Some(max_step) = max_step {
                def.solver.max_step_s = max_step;
                def.solver.min_step_s = def.solver.min_step_s.min(max_step);
            }
            if let Some(integrator) = integrator {
                def.solver.method = integrator.into();
            }
            if timing {
                timing::enable_timing();
            }
            let format = if series {
                OutputFormat::Csv
            } else if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            };
            cmd_run(&def, format)
        }
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Defaults => cmd_defaults(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn load_or_default(path: Option<&Path>) -> CliResult<ScenarioDef> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading scenario");
            Ok(pm_project::load(path)?)
        }
        None => Ok(ScenarioDef::default()),
    }
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let def = pm_project::load(scenario_path)?;
    let scenario = compile_scenario(&def)?;
    println!("✓ Scenario is valid: {}", def.name);
    println!(
        "  λ_m = {:.4e} Wb, Ke = {:.4e} V·s/rad",
        scenario.params.flux_linkage(),
        scenario.params.back_emf_constant()
    );
    Ok(())
}

fn cmd_defaults() -> CliResult<()> {
    print!("{}", pm_project::to_yaml_string(&ScenarioDef::default())?);
    Ok(())
}

fn cmd_run(def: &ScenarioDef, format: OutputFormat) -> CliResult<()> {
    let scenario = compile_scenario(def)?;
    eprintln!(
        "Running scenario: {} (t_end = {:.3} s, max_step = {:.1e} s, {:?})",
        def.name, scenario.options.t_end, scenario.options.max_step, scenario.options.integrator
    );

    let timer = timing::Timer::start("solve");
    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let result = run_scenario_with_progress(
        &scenario,
        Some(&mut |p: &SimProgress| {
            let emit_now = (p.fraction_complete - last_fraction).abs() >= 0.005
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(p);
                last_fraction = p.fraction_complete;
                last_emit = Instant::now();
            }
        }),
    );
    clear_progress_line();
    let output = result?;
    let label = timer.label();
    if let Some(elapsed) = timer.stop() {
        eprintln!("[TIMING] {}: {:.3}s", label, elapsed);
    }

    let summary = output.series.summary().ok_or(CliError::EmptyRun)?;
    match format {
        OutputFormat::Text => print_summary(&def.name, &output, &summary),
        OutputFormat::Json => {
            let json = SummaryJson::new(&def.name, &summary, &output.trajectory.stats);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Csv => write_csv(&output.series, &mut io::stdout().lock())?,
    }
    Ok(())
}

fn clear_progress_line() {
    eprint!("\r{}\r", " ".repeat(100));
    let _ = io::stderr().flush();
}

fn render_cli_progress(p: &SimProgress) {
    let width = 28usize;
    let filled = ((p.fraction_complete * width as f64).round() as usize).min(width);
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    eprint!(
        "\r[{}] {:>6.2}%  t={:.3}/{:.3}s  step={}  rejected={}",
        bar,
        p.fraction_complete * 100.0,
        p.sim_time_s,
        p.t_end_s,
        p.step,
        p.rejected_steps
    );
    let _ = io::stderr().flush();
}

fn print_summary(name: &str, output: &ScenarioOutput, summary: &RunSummary) {
    let stats = &output.trajectory.stats;
    println!("✓ Simulation completed: {}", name);
    println!(
        "  Samples: {} (accepted {}, rejected {}, rhs evals {})",
        summary.samples, stats.accepted_steps, stats.rejected_steps, stats.rhs_evals
    );
    println!("  Final time: {:.3} s", units::as_seconds(summary.final_time));
    println!(
        "  Speed:    final {:.1} RPM, peak {:.1} RPM",
        units::as_rpm(summary.final_speed),
        units::as_rpm(summary.peak_speed)
    );
    println!(
        "  Torque:   final {:.4} N·m, peak {:.4} N·m",
        units::as_n_m(summary.final_torque),
        units::as_n_m(summary.peak_torque)
    );
    println!(
        "  Battery current: final {:.3} A",
        units::as_amps(summary.final_battery_current)
    );
    println!(
        "  Charge:   {:.3} A·s ({:.5} Ah)",
        units::as_coulombs(summary.final_charge),
        units::as_amp_hours(summary.final_charge)
    );
}

fn write_csv(series: &DerivedSeries, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "time_s,rpm,torque_n_m,battery_current_a,charge_a_s")?;
    for i in 0..series.len() {
        writeln!(
            out,
            "{},{},{},{},{}",
            series.t()[i],
            series.rpm()[i],
            series.te()[i],
            series.ibat()[i],
            series.q_batt()[i]
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct SummaryJson<'a> {
    name: &'a str,
    samples: usize,
    accepted_steps: usize,
    rejected_steps: usize,
    rhs_evals: usize,
    final_time_s: f64,
    final_speed_rpm: f64,
    peak_speed_rpm: f64,
    final_torque_n_m: f64,
    peak_torque_n_m: f64,
    final_battery_current_a: f64,
    final_charge_a_s: f64,
    final_charge_ah: f64,
}

impl<'a> SummaryJson<'a> {
    fn new(name: &'a str, summary: &RunSummary, stats: &SimStats) -> Self {
        Self {
            name,
            samples: summary.samples,
            accepted_steps: stats.accepted_steps,
            rejected_steps: stats.rejected_steps,
            rhs_evals: stats.rhs_evals,
            final_time_s: units::as_seconds(summary.final_time),
            final_speed_rpm: units::as_rpm(summary.final_speed),
            peak_speed_rpm: units::as_rpm(summary.peak_speed),
            final_torque_n_m: units::as_n_m(summary.final_torque),
            peak_torque_n_m: units::as_n_m(summary.peak_torque),
            final_battery_current_a: units::as_amps(summary.final_battery_current),
            final_charge_a_s: units::as_coulombs(summary.final_charge),
            final_charge_ah: units::as_amp_hours(summary.final_charge),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_machine::{ParameterSet, PmsmState};

    #[test]
    fn cli_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "pm-cli",
            "run",
            "--t-end",
            "0.5",
            "--integrator",
            "rk4",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                scenario_path,
                t_end,
                integrator,
                json,
                series,
                ..
            } => {
                assert!(scenario_path.is_none());
                assert_eq!(t_end, Some(0.5));
                assert!(matches!(integrator, Some(IntegratorArg::Rk4)));
                assert!(json);
                assert!(!series);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn series_and_json_conflict() {
        assert!(Cli::try_parse_from(["pm-cli", "run", "--series", "--json"]).is_err());
    }

    #[test]
    fn csv_has_header_and_one_row_per_sample() {
        let params = ParameterSet::reference().unwrap();
        let states = [PmsmState::ZERO, PmsmState::ZERO];
        let series = DerivedSeries::compute(&params, &[0.0, 0.1], &states).unwrap();
        let mut buf = Vec::new();
        write_csv(&series, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "time_s,rpm,torque_n_m,battery_current_a,charge_a_s");
        assert_eq!(lines[2], "0.1,0,0,0,0");
    }
}
