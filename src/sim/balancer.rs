//! The storage balancing core.
//!
//! [`balance`] redistributes one step of residual load across a fleet of
//! storage units: deficits are covered from surplus units first, overflow
//! is shifted into spare headroom, and only the remainder is settled
//! against the grid. It is a greedy single-step balancer, not an optimizer.

use std::error::Error;
use std::fmt;

use crate::devices::StorageUnit;

/// Absolute tolerance absorbing floating-point drift from repeated
/// efficiency multiplication. All "is zero" and "is full" comparisons
/// use this value.
pub const TOLERANCE_KWH: f64 = 1e-5;

/// Result of balancing one dispatch step.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// State of charge after balancing, one entry per unit (kWh), each
    /// within `[0, capacity]`.
    pub soc_kwh: Vec<f64>,
    /// Remaining headroom per unit (kWh), each within `[0, capacity]`.
    pub headroom_kwh: Vec<f64>,
    /// Deficit no unit could cover, supplied by the grid (kWh, >= 0).
    pub grid_charge_kwh: f64,
    /// Surplus no unit could hold, absorbed by the grid (kWh, >= 0).
    pub grid_discharge_kwh: f64,
    /// Energy lost to inter-unit transfer efficiency (kWh, >= 0).
    pub loss_kwh: f64,
    /// Number of inter-unit transfers performed across both phases.
    pub transfers: usize,
}

/// Errors from the balancing core.
///
/// `NoUnits` and `LengthMismatch` are precondition failures (bad caller
/// input); `Convergence` signals a logic defect inside the balancer and is
/// never the caller's fault. None of these are retryable: the algorithm is
/// deterministic, so a retry would reproduce the same error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// The unit list is empty.
    NoUnits,
    /// Input vectors disagree on the number of units.
    LengthMismatch {
        units: usize,
        residual: usize,
        soc: usize,
    },
    /// A resolution phase exceeded its transfer bound without settling.
    Convergence {
        phase: &'static str,
        transfers: usize,
    },
}

impl fmt::Display for BalanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUnits => write!(f, "balance error: unit list is empty"),
            Self::LengthMismatch {
                units,
                residual,
                soc,
            } => write!(
                f,
                "balance error: vector lengths disagree \
                 (units={units}, residual={residual}, soc={soc})"
            ),
            Self::Convergence { phase, transfers } => write!(
                f,
                "balance error: {phase} phase failed to settle after {transfers} transfers \
                 (internal invariant violation)"
            ),
        }
    }
}

impl Error for BalanceError {}

/// Index of the smallest value among units with power budget remaining;
/// first index wins on ties. `None` when every budget is spent.
fn argmin_eligible(values: &[f64], budget_kwh: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        if budget_kwh[i] <= TOLERANCE_KWH {
            continue;
        }
        if best.is_none_or(|b| *v < values[b]) {
            best = Some(i);
        }
    }
    best
}

/// Index of the largest value among units with power budget remaining;
/// first index wins on ties. `None` when every budget is spent.
fn argmax_eligible(values: &[f64], budget_kwh: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        if budget_kwh[i] <= TOLERANCE_KWH {
            continue;
        }
        if best.is_none_or(|b| *v > values[b]) {
            best = Some(i);
        }
    }
    best
}

/// Balances one step of residual load across the fleet.
///
/// Applies the residual load to each unit's working level (`level[i] =
/// soc[i] - residual[i] * efficiency[i]`, efficiency applied on this
/// application as on any other transfer), then runs two resolution phases:
///
/// * *Deficit*: repeatedly transfers energy from the most-surplus unit to
///   the most-deficient one until every level is non-negative or no
///   feasible transfer remains; leftover deficits go to `grid_charge_kwh`.
/// * *Overflow*: repeatedly moves excess from the most-overfull unit into
///   the unit with the most spare headroom; leftover overflow goes to
///   `grid_discharge_kwh`.
///
/// Working levels may transiently sit below zero or above capacity between
/// iterations; the returned state is always within bounds. Each transfer is
/// capped by `min(power_limit[y], power_limit[z]) * dt_hours`, with per-unit
/// power budgets consumed across the whole step so no unit moves more than
/// its limit allows in total. A unit whose budget is spent drops out of
/// donor/receiver selection; a phase ends only when no budgeted unit
/// remains on one side of the transfer.
///
/// # Arguments
///
/// * `units` - Fleet parameters (state of charge on the units is ignored)
/// * `residual_kwh` - Per-unit energy deltas (positive = deficit)
/// * `soc_kwh` - Per-unit state of charge carried from the previous step
/// * `dt_hours` - Step duration in hours
///
/// # Errors
///
/// [`BalanceError::NoUnits`] or [`BalanceError::LengthMismatch`] on bad
/// input; [`BalanceError::Convergence`] if a phase exceeds its transfer
/// bound, which indicates an internal defect and never yields partial
/// results.
pub fn balance(
    units: &[StorageUnit],
    residual_kwh: &[f64],
    soc_kwh: &[f64],
    dt_hours: f64,
) -> Result<DispatchOutcome, BalanceError> {
    if units.is_empty() {
        return Err(BalanceError::NoUnits);
    }
    if residual_kwh.len() != units.len() || soc_kwh.len() != units.len() {
        return Err(BalanceError::LengthMismatch {
            units: units.len(),
            residual: residual_kwh.len(),
            soc: soc_kwh.len(),
        });
    }

    let n = units.len();
    // Every transfer zeroes the deficient unit, drains the donor, or
    // exhausts a power budget that drops a unit from selection; each of
    // those happens at most once per unit, so 3N transfers bound a phase.
    let max_transfers = 3 * n;

    let mut level: Vec<f64> = (0..n)
        .map(|i| soc_kwh[i] - residual_kwh[i] * units[i].round_trip_efficiency)
        .collect();
    let mut budget_kwh: Vec<f64> = units.iter().map(|u| u.power_budget_kwh(dt_hours)).collect();

    let mut grid_charge_kwh = 0.0;
    let mut grid_discharge_kwh = 0.0;
    let mut loss_kwh = 0.0;
    let mut transfers_total = 0usize;

    // Phase A: cover deficits from surplus units. Budget-spent units
    // drop out of selection; their leftover deficit is the grid's.
    let mut transfers = 0usize;
    loop {
        let Some(y) = argmin_eligible(&level, &budget_kwh) else {
            break;
        };
        if level[y] >= -TOLERANCE_KWH {
            break;
        }
        let Some(z) = argmax_eligible(&level, &budget_kwh) else {
            break;
        };
        if level[z] <= TOLERANCE_KWH {
            // No budgeted unit has surplus left; the rest is the grid's.
            break;
        }

        let eff = units[y].round_trip_efficiency;
        // Energy that must leave the surplus unit to net the deficit at y.
        // Every factor below exceeds the tolerance, so progress is made.
        let need = -level[y] / eff;
        let amount = need.min(budget_kwh[y].min(budget_kwh[z])).min(level[z]);

        level[y] += amount * eff;
        level[z] -= amount;
        budget_kwh[y] -= amount;
        budget_kwh[z] -= amount;
        loss_kwh += amount * (1.0 - eff);

        transfers += 1;
        if transfers > max_transfers {
            return Err(BalanceError::Convergence {
                phase: "deficit",
                transfers,
            });
        }
    }
    transfers_total += transfers;

    // Unresolved deficits are imported from the grid; sub-tolerance drift
    // is clamped without grid accounting.
    for l in &mut level {
        if *l < -TOLERANCE_KWH {
            grid_charge_kwh += -*l;
            *l = 0.0;
        } else if *l < 0.0 {
            *l = 0.0;
        }
    }

    // Phase B: shift overflow into spare headroom, same budget rules.
    let mut headroom: Vec<f64> = (0..n).map(|i| units[i].capacity_kwh - level[i]).collect();
    let mut transfers = 0usize;
    loop {
        let Some(z) = argmin_eligible(&headroom, &budget_kwh) else {
            break;
        };
        if headroom[z] >= -TOLERANCE_KWH {
            break;
        }
        let Some(y) = argmax_eligible(&headroom, &budget_kwh) else {
            break;
        };
        if headroom[y] <= TOLERANCE_KWH {
            // No budgeted unit has spare capacity left.
            break;
        }

        let excess = -headroom[z];
        let amount = excess.min(headroom[y]).min(budget_kwh[y].min(budget_kwh[z]));

        let eff = units[y].round_trip_efficiency;
        level[z] -= amount;
        level[y] += amount * eff;
        budget_kwh[y] -= amount;
        budget_kwh[z] -= amount;
        loss_kwh += amount * (1.0 - eff);
        headroom[z] = units[z].capacity_kwh - level[z];
        headroom[y] = units[y].capacity_kwh - level[y];

        transfers += 1;
        if transfers > max_transfers {
            return Err(BalanceError::Convergence {
                phase: "overflow",
                transfers,
            });
        }
    }
    transfers_total += transfers;

    // Unresolved overflow is exported to the grid.
    for (i, l) in level.iter_mut().enumerate() {
        let over = *l - units[i].capacity_kwh;
        if over > TOLERANCE_KWH {
            grid_discharge_kwh += over;
            *l = units[i].capacity_kwh;
        } else if over > 0.0 {
            *l = units[i].capacity_kwh;
        }
    }

    for (i, l) in level.iter().enumerate() {
        debug_assert!(
            *l >= 0.0 && *l <= units[i].capacity_kwh,
            "post-balance level out of bounds for unit {i}: {l}"
        );
    }

    let headroom_kwh: Vec<f64> = (0..n).map(|i| units[i].capacity_kwh - level[i]).collect();
    Ok(DispatchOutcome {
        soc_kwh: level,
        headroom_kwh,
        grid_charge_kwh,
        grid_discharge_kwh,
        loss_kwh,
        transfers: transfers_total,
    })
}
