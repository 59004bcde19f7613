//! Post-hoc KPI computation from simulation results.

use std::fmt;

use super::types::StepResult;

/// Aggregate key performance indicators derived from a complete run.
///
/// Computed post-hoc from `Vec<StepResult>` to ensure consistency between
/// step data and reported metrics.
#[derive(Debug, Clone)]
pub struct KpiReport {
    /// Total energy imported from the grid (kWh).
    pub grid_charge_kwh: f64,
    /// Total energy exported to the grid (kWh).
    pub grid_discharge_kwh: f64,
    /// Total inter-unit transfer losses (kWh).
    pub loss_kwh: f64,
    /// Share of the total deficit covered without grid import (%).
    pub self_sufficiency_pct: f64,
    /// Share of the total surplus retained without grid export (%).
    pub self_consumption_pct: f64,
    /// Highest single-step grid import rate (kW).
    pub peak_grid_charge_kw: f64,
    /// Highest single-step grid export rate (kW).
    pub peak_grid_discharge_kw: f64,
    /// Total fleet energy throughput (kWh, sum of per-unit |delta SoC|).
    pub throughput_kwh: f64,
    /// Fleet equivalent full cycles (throughput / 2 * total capacity).
    pub equivalent_full_cycles: f64,
    /// Total number of inter-unit transfers.
    pub transfers: usize,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    /// * `dt_hours` - Timestep duration in hours
    /// * `fleet_capacity_kwh` - Summed unit capacities for cycle counting
    /// * `initial_soc_kwh` - Per-unit state of charge before the first step
    pub fn from_results(
        results: &[StepResult],
        dt_hours: f64,
        fleet_capacity_kwh: f64,
        initial_soc_kwh: &[f64],
    ) -> Self {
        if results.is_empty() {
            return Self {
                grid_charge_kwh: 0.0,
                grid_discharge_kwh: 0.0,
                loss_kwh: 0.0,
                self_sufficiency_pct: 100.0,
                self_consumption_pct: 100.0,
                peak_grid_charge_kw: 0.0,
                peak_grid_discharge_kw: 0.0,
                throughput_kwh: 0.0,
                equivalent_full_cycles: 0.0,
                transfers: 0,
            };
        }

        let mut grid_charge = 0.0_f64;
        let mut grid_discharge = 0.0_f64;
        let mut loss = 0.0_f64;
        let mut deficit = 0.0_f64;
        let mut surplus = 0.0_f64;
        let mut peak_charge_kwh = 0.0_f64;
        let mut peak_discharge_kwh = 0.0_f64;
        let mut throughput = 0.0_f64;
        let mut transfers = 0_usize;

        let mut prev_soc: Vec<f64> = initial_soc_kwh.to_vec();
        for r in results {
            grid_charge += r.grid_charge_kwh;
            grid_discharge += r.grid_discharge_kwh;
            loss += r.loss_kwh;
            deficit += r.deficit_kwh();
            surplus += r.surplus_kwh();
            peak_charge_kwh = peak_charge_kwh.max(r.grid_charge_kwh);
            peak_discharge_kwh = peak_discharge_kwh.max(r.grid_discharge_kwh);
            transfers += r.transfers;

            for (soc, prev) in r.soc_kwh.iter().zip(&prev_soc) {
                throughput += (soc - prev).abs();
            }
            prev_soc.clone_from(&r.soc_kwh);
        }

        let self_sufficiency_pct = if deficit > 0.0 {
            100.0 * (1.0 - grid_charge / deficit)
        } else {
            100.0
        };
        let self_consumption_pct = if surplus > 0.0 {
            100.0 * (1.0 - grid_discharge / surplus)
        } else {
            100.0
        };
        let cycles = if fleet_capacity_kwh > 0.0 {
            throughput / (2.0 * fleet_capacity_kwh)
        } else {
            0.0
        };

        Self {
            grid_charge_kwh: grid_charge,
            grid_discharge_kwh: grid_discharge,
            loss_kwh: loss,
            self_sufficiency_pct,
            self_consumption_pct,
            peak_grid_charge_kw: peak_charge_kwh / dt_hours,
            peak_grid_discharge_kw: peak_discharge_kwh / dt_hours,
            throughput_kwh: throughput,
            equivalent_full_cycles: cycles,
            transfers,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Grid import:          {:.3} kWh", self.grid_charge_kwh)?;
        writeln!(f, "Grid export:          {:.3} kWh", self.grid_discharge_kwh)?;
        writeln!(f, "Transfer losses:      {:.3} kWh", self.loss_kwh)?;
        writeln!(f, "Self-sufficiency:     {:.1}%", self.self_sufficiency_pct)?;
        writeln!(f, "Self-consumption:     {:.1}%", self.self_consumption_pct)?;
        writeln!(f, "Peak grid import:     {:.2} kW", self.peak_grid_charge_kw)?;
        writeln!(f, "Peak grid export:     {:.2} kW", self.peak_grid_discharge_kw)?;
        writeln!(
            f,
            "Fleet throughput:     {:.2} kWh ({:.2} equiv. cycles)",
            self.throughput_kwh, self.equivalent_full_cycles
        )?;
        write!(f, "Inter-unit transfers: {}", self.transfers)
    }
}
