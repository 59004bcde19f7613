//! Shared test fixtures for integration tests.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use bess_sim::devices::StorageUnit;
use bess_sim::profile;
use bess_sim::sim::types::{SimConfig, StepResult};

/// Default simulation configuration (24 steps/day, 1 day, seed 42).
pub fn default_config() -> SimConfig {
    SimConfig::new(24, 1, 42)
}

/// Baseline fleet: three identical household units (7 kWh, 5 kW, 95%).
pub fn baseline_fleet() -> Vec<StorageUnit> {
    vec![
        StorageUnit::new("hh_1", 7.0, 5.0, 0.95, 0.0),
        StorageUnit::new("hh_2", 7.0, 5.0, 0.95, 0.0),
        StorageUnit::new("hh_3", 7.0, 5.0, 0.95, 0.0),
    ]
}

/// Lossless two-unit fleet for exact-arithmetic assertions.
pub fn lossless_pair() -> Vec<StorageUnit> {
    vec![
        StorageUnit::new("a", 7.0, 5.0, 1.0, 0.0),
        StorageUnit::new("b", 7.0, 5.0, 1.0, 0.0),
    ]
}

/// Default synthetic residual profile for the given fleet size.
///
/// Morning/evening deficits with a mid-day surplus swing, mild noise.
pub fn default_rows(config: &SimConfig, n_units: usize) -> Vec<Vec<f64>> {
    profile::synthetic_rows(config, 0.4, 2.5, 1.2, 0.05, n_units)
}

/// Asserts the step-level energy balance across an entire run:
/// `delta_soc + export - import + loss == sum(-residual * efficiency)`.
pub fn assert_run_conserved(
    results: &[StepResult],
    units: &[StorageUnit],
    initial_soc: &[f64],
) {
    let mut prev_soc: Vec<f64> = initial_soc.to_vec();
    for r in results {
        let applied: f64 = r
            .residual_kwh
            .iter()
            .zip(units)
            .map(|(res, u)| -res * u.round_trip_efficiency)
            .sum();
        let delta: f64 = r.fleet_soc_kwh() - prev_soc.iter().sum::<f64>();
        let balance = delta + r.grid_discharge_kwh - r.grid_charge_kwh + r.loss_kwh;
        assert!(
            (balance - applied).abs() < 1e-5,
            "energy balance violated at t={}: balance={balance}, applied={applied}",
            r.timestep
        );
        prev_soc.clone_from(&r.soc_kwh);
    }
}
