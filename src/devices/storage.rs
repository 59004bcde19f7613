/// A battery storage unit that can absorb surplus energy and cover deficits.
///
/// `StorageUnit` co-locates the static parameters (capacity, power limit,
/// round-trip efficiency) with the mutable state of charge, so that a fleet
/// is a single ordered collection of records rather than index-aligned
/// parallel vectors.
///
/// # Sign Convention (Residual Load)
/// - Positive residual: local deficit, covered by discharging
/// - Negative residual: local surplus, absorbed by charging
#[derive(Debug, Clone)]
pub struct StorageUnit {
    /// Unit name used in reports and telemetry columns.
    pub name: String,

    /// Usable energy capacity in kilowatt-hours (> 0).
    pub capacity_kwh: f64,

    /// Maximum charge/discharge power in kilowatts (> 0).
    pub power_limit_kw: f64,

    /// Fraction of energy retained per transfer, in (0, 1].
    pub round_trip_efficiency: f64,

    /// Current state of charge in kilowatt-hours.
    pub soc_kwh: f64,
}

impl StorageUnit {
    /// Creates a new storage unit with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `name` - Unit name for reporting
    /// * `capacity_kwh` - Usable capacity in kWh (must be > 0)
    /// * `power_limit_kw` - Maximum charge/discharge power in kW (must be > 0)
    /// * `round_trip_efficiency` - Retained fraction per transfer, in (0, 1]
    /// * `initial_soc_kwh` - Initial state of charge in `[0, capacity_kwh]`
    ///
    /// # Panics
    ///
    /// Panics if capacity or power limit is non-positive, efficiency is
    /// outside (0, 1], or the initial state of charge is out of range.
    /// Configuration loaded from TOML is validated before construction,
    /// so these fire only on programmer error.
    pub fn new(
        name: impl Into<String>,
        capacity_kwh: f64,
        power_limit_kw: f64,
        round_trip_efficiency: f64,
        initial_soc_kwh: f64,
    ) -> Self {
        assert!(capacity_kwh > 0.0, "capacity_kwh must be > 0");
        assert!(power_limit_kw > 0.0, "power_limit_kw must be > 0");
        assert!(
            round_trip_efficiency > 0.0 && round_trip_efficiency <= 1.0,
            "round_trip_efficiency must be in (0, 1]"
        );
        assert!(
            (0.0..=capacity_kwh).contains(&initial_soc_kwh),
            "initial_soc_kwh must be in [0, capacity_kwh]"
        );

        Self {
            name: name.into(),
            capacity_kwh,
            power_limit_kw,
            round_trip_efficiency,
            soc_kwh: initial_soc_kwh,
        }
    }

    /// Unused capacity in kWh: `capacity_kwh - soc_kwh`.
    pub fn headroom_kwh(&self) -> f64 {
        self.capacity_kwh - self.soc_kwh
    }

    /// Maximum energy this unit may move in one step of `dt_hours`.
    pub fn power_budget_kwh(&self, dt_hours: f64) -> f64 {
        self.power_limit_kw * dt_hours
    }

    /// Applies one step of residual load to this unit alone.
    ///
    /// Discharges on deficit (positive residual) and charges on surplus
    /// (negative residual), applying the round-trip efficiency once and
    /// clamping the state of charge to `[0, capacity_kwh]`. Power limits
    /// bind inter-unit transfers, not a unit serving its own residual.
    ///
    /// # Arguments
    ///
    /// * `residual_kwh` - Energy delta for the step (positive = deficit)
    ///
    /// # Returns
    ///
    /// The unresolved remainder in the residual-load convention: positive
    /// is a deficit the grid must supply, negative a surplus it must absorb.
    pub fn apply_residual_kwh(&mut self, residual_kwh: f64) -> f64 {
        // Desired state-of-charge change, efficiency applied on the transfer.
        let delta_kwh = -residual_kwh * self.round_trip_efficiency;
        let bounded_kwh = delta_kwh.clamp(-self.soc_kwh, self.headroom_kwh());

        self.soc_kwh += bounded_kwh;
        self.soc_kwh = self.soc_kwh.clamp(0.0, self.capacity_kwh);

        // Unserved part, mapped back to the residual-load convention.
        -(delta_kwh - bounded_kwh) / self.round_trip_efficiency
    }
}
