//! Simulation engine that walks the residual-load profile step by step.

use crate::devices::StorageUnit;

use super::balancer::{BalanceError, balance};
use super::types::{SimConfig, StepResult};

/// How the fleet resolves each step's residual load.
///
/// The two strategies settle grid remainders in different units.
/// `Independent` reports what each unit could not serve in residual-load
/// terms (pre-efficiency, as the grid would see it) and leaves `loss_kwh`
/// at zero, with charging losses implicit in the state of charge.
/// `Balanced` settles post-efficiency working levels and reports transfer
/// losses explicitly. For fleets with sub-unity efficiency the two
/// strategies' grid totals are therefore not directly comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// Every unit serves only its own residual; no inter-unit transfers.
    Independent,
    /// The storage balancer redistributes energy across the fleet before
    /// the grid is touched.
    Balanced,
}

/// Simulation engine owning the fleet, the residual profile, and timing.
///
/// Steps are strictly sequential: the state of charge carried out of step
/// `t` is exactly what step `t + 1` observes. Independent runs (parameter
/// sweeps) each own their engine; nothing is shared.
pub struct Engine {
    config: SimConfig,
    units: Vec<StorageUnit>,
    strategy: DispatchStrategy,
    /// Residual load rows in kW, one row per step, one column per unit.
    residual_kw: Vec<Vec<f64>>,
}

impl Engine {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulation timing configuration
    /// * `units` - Storage fleet with initial state of charge set
    /// * `strategy` - Dispatch strategy for every step
    /// * `residual_kw` - Residual load in kW, `total_steps` rows of
    ///   `units.len()` columns
    ///
    /// # Panics
    ///
    /// Panics if the fleet is empty or the profile shape does not match
    /// the configuration. Scenario validation reports these as
    /// configuration errors before an engine is ever built.
    pub fn new(
        config: SimConfig,
        units: Vec<StorageUnit>,
        strategy: DispatchStrategy,
        residual_kw: Vec<Vec<f64>>,
    ) -> Self {
        assert!(!units.is_empty(), "fleet must not be empty");
        assert_eq!(
            residual_kw.len(),
            config.total_steps(),
            "profile must have one row per step"
        );
        assert!(
            residual_kw.iter().all(|row| row.len() == units.len()),
            "every profile row must have one column per unit"
        );

        Self {
            config,
            units,
            strategy,
            residual_kw,
        }
    }

    /// Executes one dispatch step and returns its record.
    ///
    /// # Errors
    ///
    /// Propagates [`BalanceError`] from the balancing core; the engine
    /// state is not advanced past a failed step.
    pub fn step(&mut self, t: usize) -> Result<StepResult, BalanceError> {
        let dt = self.config.dt_hours;
        let residual_kwh: Vec<f64> = self.residual_kw[t].iter().map(|kw| kw * dt).collect();

        let (grid_charge_kwh, grid_discharge_kwh, loss_kwh, transfers) = match self.strategy {
            DispatchStrategy::Balanced => {
                let soc: Vec<f64> = self.units.iter().map(|u| u.soc_kwh).collect();
                let out = balance(&self.units, &residual_kwh, &soc, dt)?;
                for (unit, soc) in self.units.iter_mut().zip(&out.soc_kwh) {
                    unit.soc_kwh = *soc;
                }
                (
                    out.grid_charge_kwh,
                    out.grid_discharge_kwh,
                    out.loss_kwh,
                    out.transfers,
                )
            }
            DispatchStrategy::Independent => {
                let mut grid_charge = 0.0;
                let mut grid_discharge = 0.0;
                for (unit, r) in self.units.iter_mut().zip(&residual_kwh) {
                    let unresolved = unit.apply_residual_kwh(*r);
                    if unresolved > 0.0 {
                        grid_charge += unresolved;
                    } else {
                        grid_discharge += -unresolved;
                    }
                }
                (grid_charge, grid_discharge, 0.0, 0)
            }
        };

        Ok(StepResult {
            timestep: t,
            time_hr: t as f64 * dt,
            residual_kwh,
            soc_kwh: self.units.iter().map(|u| u.soc_kwh).collect(),
            headroom_kwh: self.units.iter().map(StorageUnit::headroom_kwh).collect(),
            grid_charge_kwh,
            grid_discharge_kwh,
            loss_kwh,
            transfers,
        })
    }

    /// Executes all timesteps and returns the complete step record vector.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step and propagates its [`BalanceError`];
    /// partial results are never returned as if valid.
    pub fn run(&mut self) -> Result<Vec<StepResult>, BalanceError> {
        let total = self.config.total_steps();
        let mut results = Vec::with_capacity(total);
        for t in 0..total {
            results.push(self.step(t)?);
        }
        Ok(results)
    }

    /// Returns the storage fleet (for KPI capacity queries).
    pub fn units(&self) -> &[StorageUnit] {
        &self.units
    }

    /// Returns the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
