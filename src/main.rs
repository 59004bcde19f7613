//! Storage fleet simulator entry point: CLI wiring and config-driven
//! engine construction.

use std::path::Path;
use std::process;

use bess_sim::config::ScenarioConfig;
use bess_sim::devices::StorageUnit;
use bess_sim::io::export::export_csv;
use bess_sim::profile;
use bess_sim::sim::engine::{DispatchStrategy, Engine};
use bess_sim::sim::kpi::KpiReport;
use bess_sim::sim::types::SimConfig;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    profile_path: Option<String>,
    seed_override: Option<u64>,
    telemetry_out: Option<String>,
}

fn print_help() {
    eprintln!("bess-sim — multi-unit battery storage dispatch simulator");
    eprintln!();
    eprintln!("Usage: bess-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, mixed_fleet, lossy)");
    eprintln!("  --profile <path>         Read residual load from a CSV file");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --telemetry-out <path>   Export step results to CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        profile_path: None,
        seed_override: None,
        telemetry_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--profile" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --profile requires a path argument");
                    process::exit(1);
                }
                cli.profile_path = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                if let Ok(s) = args[i].parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                    process::exit(1);
                }
            }
            "--telemetry-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --telemetry-out requires a path argument");
                    process::exit(1);
                }
                cli.telemetry_out = Some(args[i].clone());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Builds the fleet and the residual-load profile from a validated scenario.
///
/// Returns `(sim_config, units, strategy, residual_kw)`.
fn build_scenario(
    cfg: &ScenarioConfig,
) -> Result<(SimConfig, Vec<StorageUnit>, DispatchStrategy, Vec<Vec<f64>>), String> {
    let s = &cfg.simulation;
    let sim_config = SimConfig::new(s.steps_per_day, s.days, s.seed);

    let units: Vec<StorageUnit> = cfg
        .units
        .iter()
        .map(|u| {
            StorageUnit::new(
                u.name.clone(),
                u.capacity_kwh,
                u.power_limit_kw,
                u.round_trip_efficiency,
                u.initial_soc_kwh,
            )
        })
        .collect();

    let strategy = match s.strategy.as_str() {
        "independent" => DispatchStrategy::Independent,
        _ => DispatchStrategy::Balanced,
    };

    let p = &cfg.profile;
    let residual_kw = match p.source.as_str() {
        "csv" => {
            let path = p.path.as_deref().unwrap_or_default();
            let rows = profile::load_csv(Path::new(path), units.len())
                .map_err(|e| e.to_string())?;
            if rows.len() != sim_config.total_steps() {
                return Err(format!(
                    "profile error in {}: expected {} rows (one per step), found {}",
                    path,
                    sim_config.total_steps(),
                    rows.len()
                ));
            }
            rows
        }
        _ => profile::synthetic_rows(
            &sim_config,
            p.mean_kw,
            p.amp_kw,
            p.phase_rad,
            p.noise_std,
            units.len(),
        ),
    };

    Ok((sim_config, units, strategy, residual_kw))
}

fn main() {
    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then baseline
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    // Apply overrides
    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(ref path) = cli.profile_path {
        scenario.profile.source = "csv".to_string();
        scenario.profile.path = Some(path.clone());
    }

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // Build
    let (sim_config, units, strategy, residual_kw) = match build_scenario(&scenario) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let unit_names: Vec<String> = units.iter().map(|u| u.name.clone()).collect();
    let initial_soc: Vec<f64> = units.iter().map(|u| u.soc_kwh).collect();
    let fleet_capacity: f64 = units.iter().map(|u| u.capacity_kwh).sum();
    let dt = sim_config.dt_hours;

    // Run
    let mut engine = Engine::new(sim_config, units, strategy, residual_kw);
    let results = match engine.run() {
        Ok(results) => results,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // Print per-step results
    for r in &results {
        println!("{r}");
    }

    // Print KPI report
    let kpi = KpiReport::from_results(&results, dt, fleet_capacity, &initial_soc);
    println!("\n{kpi}");

    // Export CSV if requested
    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&results, &unit_names, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }
}
