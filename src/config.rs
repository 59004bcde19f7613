//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario except the unit
/// list, which must be non-empty. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::baseline`]
/// for the built-in default. Unknown fields are rejected at parse time;
/// every unit parameter is an explicitly enumerated field.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and strategy parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Residual-load profile source parameters.
    #[serde(default)]
    pub profile: ProfileConfig,
    /// Storage fleet, one entry per unit.
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

/// Simulation timing and strategy parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of timesteps per simulated day (must be > 0).
    pub steps_per_day: usize,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Master random seed for synthetic profiles.
    pub seed: u64,
    /// Dispatch strategy: `"balanced"` or `"independent"`.
    pub strategy: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps_per_day: 96,
            days: 1,
            seed: 42,
            strategy: "balanced".to_string(),
        }
    }
}

/// Residual-load profile source parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Profile source: `"synthetic"` or `"csv"`.
    pub source: String,
    /// CSV file path, required when `source = "csv"`.
    pub path: Option<String>,
    /// Synthetic generator: mean residual load (kW).
    pub mean_kw: f64,
    /// Synthetic generator: daily sinusoid amplitude (kW).
    pub amp_kw: f64,
    /// Synthetic generator: sinusoid phase offset (radians).
    pub phase_rad: f64,
    /// Synthetic generator: Gaussian noise standard deviation (kW).
    pub noise_std: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            source: "synthetic".to_string(),
            path: None,
            mean_kw: 0.4,
            amp_kw: 2.5,
            phase_rad: 1.2,
            noise_std: 0.05,
        }
    }
}

/// Parameters of one storage unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitConfig {
    /// Unit name, used in reports and telemetry columns (must be non-empty).
    pub name: String,
    /// Usable energy capacity (kWh, must be > 0).
    pub capacity_kwh: f64,
    /// Maximum charge/discharge power (kW, must be > 0).
    pub power_limit_kw: f64,
    /// Retained fraction per transfer (must be in (0, 1]).
    pub round_trip_efficiency: f64,
    /// Initial state of charge (kWh, must be in [0, capacity_kwh]).
    pub initial_soc_kwh: f64,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            capacity_kwh: 7.0,
            power_limit_kw: 5.0,
            round_trip_efficiency: 0.95,
            initial_soc_kwh: 0.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"units[1].capacity_kwh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn unit(name: &str, capacity_kwh: f64, power_limit_kw: f64, round_trip_efficiency: f64) -> UnitConfig {
    UnitConfig {
        name: name.to_string(),
        capacity_kwh,
        power_limit_kw,
        round_trip_efficiency,
        initial_soc_kwh: 0.0,
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: three identical household units on
    /// the quarter-hour grid.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            profile: ProfileConfig::default(),
            units: vec![
                unit("hh_1", 7.0, 5.0, 0.95),
                unit("hh_2", 7.0, 5.0, 0.95),
                unit("hh_3", 7.0, 5.0, 0.95),
            ],
        }
    }

    /// Returns the mixed-fleet preset: heterogeneous capacities and power
    /// limits, where the balancer has real redistribution work to do.
    pub fn mixed_fleet() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            profile: ProfileConfig {
                amp_kw: 3.5,
                ..ProfileConfig::default()
            },
            units: vec![
                unit("hh_small", 7.0, 4.0, 0.95),
                unit("hh_slow", 7.0, 2.0, 0.95),
                unit("district", 9.0, 5.0, 0.95),
            ],
        }
    }

    /// Returns the lossy preset: sub-unity round-trip efficiencies to
    /// exercise transfer loss accounting.
    pub fn lossy() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            profile: ProfileConfig::default(),
            units: vec![unit("hh_1", 10.0, 5.0, 0.90), unit("hh_2", 10.0, 5.0, 0.85)],
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "mixed_fleet", "lossy"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "mixed_fleet" => Ok(Self::mixed_fleet()),
            "lossy" => Ok(Self::lossy()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is
    /// invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown
    /// fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid; the
    /// simulation must not proceed otherwise.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.steps_per_day == 0 {
            errors.push(ConfigError {
                field: "simulation.steps_per_day".into(),
                message: "must be > 0".into(),
            });
        }
        if s.days == 0 {
            errors.push(ConfigError {
                field: "simulation.days".into(),
                message: "must be > 0".into(),
            });
        }
        if s.strategy != "balanced" && s.strategy != "independent" {
            errors.push(ConfigError {
                field: "simulation.strategy".into(),
                message: format!(
                    "must be \"balanced\" or \"independent\", got \"{}\"",
                    s.strategy
                ),
            });
        }

        let p = &self.profile;
        if p.source != "synthetic" && p.source != "csv" {
            errors.push(ConfigError {
                field: "profile.source".into(),
                message: format!("must be \"synthetic\" or \"csv\", got \"{}\"", p.source),
            });
        }
        if p.source == "csv" && p.path.is_none() {
            errors.push(ConfigError {
                field: "profile.path".into(),
                message: "required when profile.source = \"csv\"".into(),
            });
        }
        if p.noise_std < 0.0 {
            errors.push(ConfigError {
                field: "profile.noise_std".into(),
                message: "must be >= 0".into(),
            });
        }

        if self.units.is_empty() {
            errors.push(ConfigError {
                field: "units".into(),
                message: "at least one storage unit is required".into(),
            });
        }
        for (i, u) in self.units.iter().enumerate() {
            if u.name.is_empty() {
                errors.push(ConfigError {
                    field: format!("units[{i}].name"),
                    message: "must not be empty".into(),
                });
            }
            if u.capacity_kwh <= 0.0 {
                errors.push(ConfigError {
                    field: format!("units[{i}].capacity_kwh"),
                    message: "must be > 0".into(),
                });
            }
            if u.power_limit_kw <= 0.0 {
                errors.push(ConfigError {
                    field: format!("units[{i}].power_limit_kw"),
                    message: "must be > 0".into(),
                });
            }
            if u.round_trip_efficiency <= 0.0 || u.round_trip_efficiency > 1.0 {
                errors.push(ConfigError {
                    field: format!("units[{i}].round_trip_efficiency"),
                    message: "must be in (0, 1]".into(),
                });
            }
            if u.capacity_kwh > 0.0
                && !(0.0..=u.capacity_kwh).contains(&u.initial_soc_kwh)
            {
                errors.push(ConfigError {
                    field: format!("units[{i}].initial_soc_kwh"),
                    message: "must be in [0, capacity_kwh]".into(),
                });
            }
        }

        errors
    }
}
