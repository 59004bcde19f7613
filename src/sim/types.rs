//! Core simulation types: configuration and per-step records.

use std::fmt;

/// Centralized simulation timing configuration.
///
/// The engine, profile sources, and the balancer all reference this struct
/// for step timing, eliminating duplicated `dt_hours` computations.
///
/// # Examples
///
/// ```
/// use bess_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(96, 1, 42);
/// assert_eq!(cfg.dt_hours, 0.25);
/// assert_eq!(cfg.total_steps(), 96);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of simulation steps per day.
    pub steps_per_day: usize,
    /// Number of days to simulate.
    pub days: usize,
    /// Duration of one timestep in hours, derived as `24.0 / steps_per_day`.
    pub dt_hours: f64,
    /// Master random seed for synthetic profiles.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new simulation configuration.
    ///
    /// # Arguments
    ///
    /// * `steps_per_day` - Number of timesteps per simulated day (must be > 0)
    /// * `days` - Number of days to simulate (must be > 0)
    /// * `seed` - Master random seed
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` or `days` is zero.
    pub fn new(steps_per_day: usize, days: usize, seed: u64) -> Self {
        assert!(steps_per_day > 0, "steps_per_day must be > 0");
        assert!(days > 0, "days must be > 0");
        Self {
            steps_per_day,
            days,
            dt_hours: 24.0 / steps_per_day as f64,
            seed,
        }
    }

    /// Total number of simulation steps across all days.
    pub fn total_steps(&self) -> usize {
        self.steps_per_day * self.days
    }
}

/// Complete record of one dispatch step.
///
/// `grid_charge_kwh` is energy the grid had to supply (import),
/// `grid_discharge_kwh` energy it had to absorb (export).
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Timestep index.
    pub timestep: usize,
    /// Simulation time in hours.
    pub time_hr: f64,
    /// Residual load applied this step, one entry per unit (kWh).
    pub residual_kwh: Vec<f64>,
    /// State of charge after balancing, one entry per unit (kWh).
    pub soc_kwh: Vec<f64>,
    /// Headroom after balancing, one entry per unit (kWh).
    pub headroom_kwh: Vec<f64>,
    /// Deficit the grid supplied this step (kWh, >= 0).
    pub grid_charge_kwh: f64,
    /// Surplus the grid absorbed this step (kWh, >= 0).
    pub grid_discharge_kwh: f64,
    /// Energy lost to inter-unit transfer efficiency this step (kWh, >= 0).
    pub loss_kwh: f64,
    /// Number of inter-unit transfers performed this step.
    pub transfers: usize,
}

impl StepResult {
    /// Sum of deficits in the applied residual load (kWh, >= 0).
    pub fn deficit_kwh(&self) -> f64 {
        self.residual_kwh.iter().filter(|r| **r > 0.0).sum()
    }

    /// Sum of surplus magnitudes in the applied residual load (kWh, >= 0).
    pub fn surplus_kwh(&self) -> f64 {
        -self.residual_kwh.iter().filter(|r| **r < 0.0).sum::<f64>()
    }

    /// Total fleet state of charge after this step (kWh).
    pub fn fleet_soc_kwh(&self) -> f64 {
        self.soc_kwh.iter().sum()
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} ({:>6.2}h) | soc=[",
            self.timestep, self.time_hr,
        )?;
        for (i, soc) in self.soc_kwh.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{soc:.2}")?;
        }
        write!(
            f,
            "] kWh | grid(in={:.3}, out={:.3}) kWh  loss={:.3} kWh  transfers={}",
            self.grid_charge_kwh, self.grid_discharge_kwh, self.loss_kwh, self.transfers,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_config_basic() {
        let cfg = SimConfig::new(24, 1, 42);
        assert_eq!(cfg.steps_per_day, 24);
        assert_eq!(cfg.days, 1);
        assert_eq!(cfg.dt_hours, 1.0);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.total_steps(), 24);
    }

    #[test]
    fn sim_config_quarter_hour_multi_day() {
        let cfg = SimConfig::new(96, 3, 0);
        assert_eq!(cfg.dt_hours, 0.25);
        assert_eq!(cfg.total_steps(), 288);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_steps_panics() {
        SimConfig::new(0, 1, 0);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_days_panics() {
        SimConfig::new(24, 0, 0);
    }

    fn make_result() -> StepResult {
        StepResult {
            timestep: 3,
            time_hr: 0.75,
            residual_kwh: vec![2.0, -1.5, 0.5],
            soc_kwh: vec![1.0, 4.5, 0.0],
            headroom_kwh: vec![6.0, 2.5, 9.0],
            grid_charge_kwh: 0.25,
            grid_discharge_kwh: 0.0,
            loss_kwh: 0.05,
            transfers: 1,
        }
    }

    #[test]
    fn deficit_and_surplus_split_by_sign() {
        let r = make_result();
        assert!((r.deficit_kwh() - 2.5).abs() < 1e-12);
        assert!((r.surplus_kwh() - 1.5).abs() < 1e-12);
        assert!((r.fleet_soc_kwh() - 5.5).abs() < 1e-12);
    }

    #[test]
    fn step_result_display_does_not_panic() {
        let s = format!("{}", make_result());
        assert!(s.contains("grid(in=0.250"));
    }
}
