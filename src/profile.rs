//! Residual-load profile sources.
//!
//! A profile is one row per timestep and one column per storage unit, in
//! kW (positive = local deficit, negative = local surplus). Rows come
//! either from a delimited text file with a leading timestamp column or
//! from the seeded synthetic generator.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::sim::types::SimConfig;

/// Seed offset between per-unit generators so their noise is uncorrelated.
const UNIT_SEED_OFFSET: u64 = 31;

/// Upstream profile failure: I/O, malformed CSV, or a shape mismatch.
///
/// Kept separate from the balancer's error type so a driver can tell
/// "bad input" from "bad simulation logic".
#[derive(Debug)]
pub struct ProfileError {
    /// What was being read (file path or source description).
    pub context: String,
    /// Human-readable failure description.
    pub message: String,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profile error in {}: {}", self.context, self.message)
    }
}

impl Error for ProfileError {}

/// Gaussian noise via the Box-Muller transform, mean 0.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// A synthetic residual-load generator for one unit.
///
/// Produces a sinusoidal daily pattern around `mean_kw` with Gaussian
/// noise. With a negative mid-day swing this stands in for a site with
/// solar generation; values are deliberately not clamped, since negative
/// residual load means storable surplus.
#[derive(Debug, Clone)]
pub struct SyntheticResidual {
    /// Mean residual load in kW.
    pub mean_kw: f64,
    /// Amplitude of the daily sinusoid in kW.
    pub amp_kw: f64,
    /// Phase offset of the sinusoid in radians.
    pub phase_rad: f64,
    /// Standard deviation of the Gaussian noise in kW.
    pub noise_std: f64,
    steps_per_day: usize,
    rng: StdRng,
}

impl SyntheticResidual {
    /// Creates a new generator with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `mean_kw` - Mean residual load in kW
    /// * `amp_kw` - Amplitude of the daily sinusoid in kW
    /// * `phase_rad` - Phase offset in radians
    /// * `noise_std` - Standard deviation of the Gaussian noise in kW
    /// * `steps_per_day` - Number of timesteps per simulated day
    /// * `seed` - Seed for reproducible noise
    pub fn new(
        mean_kw: f64,
        amp_kw: f64,
        phase_rad: f64,
        noise_std: f64,
        steps_per_day: usize,
        seed: u64,
    ) -> Self {
        Self {
            mean_kw,
            amp_kw,
            phase_rad,
            noise_std,
            steps_per_day: steps_per_day.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Residual load in kW at the given timestep.
    pub fn residual_kw(&mut self, timestep: usize) -> f64 {
        let day_pos = (timestep % self.steps_per_day) as f64 / self.steps_per_day as f64;
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.phase_rad;
        self.mean_kw + self.amp_kw * angle.sin() + gaussian_noise(&mut self.rng, self.noise_std)
    }
}

/// Generates a full synthetic profile: `total_steps` rows, `n_units` columns.
///
/// Each unit gets its own generator seeded at a fixed offset from the
/// master seed, so fleets of different sizes stay reproducible.
pub fn synthetic_rows(
    config: &SimConfig,
    mean_kw: f64,
    amp_kw: f64,
    phase_rad: f64,
    noise_std: f64,
    n_units: usize,
) -> Vec<Vec<f64>> {
    let mut generators: Vec<SyntheticResidual> = (0..n_units)
        .map(|i| {
            SyntheticResidual::new(
                mean_kw,
                amp_kw,
                phase_rad,
                noise_std,
                config.steps_per_day,
                config.seed.wrapping_add(i as u64 * UNIT_SEED_OFFSET),
            )
        })
        .collect();

    (0..config.total_steps())
        .map(|t| generators.iter_mut().map(|g| g.residual_kw(t)).collect())
        .collect()
}

/// Loads a residual-load profile from a CSV file.
///
/// Expected shape: a header row, a leading timestamp column, then one load
/// column per unit, e.g. `time,hh_1,hh_2,hh_3`. Timestamp values are kept
/// opaque; ordering is taken from row order.
///
/// # Errors
///
/// Returns a [`ProfileError`] if the file cannot be read, the column count
/// does not match `n_units`, or any load value fails to parse.
pub fn load_csv(path: &Path, n_units: usize) -> Result<Vec<Vec<f64>>, ProfileError> {
    let file = File::open(path).map_err(|e| ProfileError {
        context: path.display().to_string(),
        message: format!("cannot open: {e}"),
    })?;
    read_csv(file, &path.display().to_string(), n_units)
}

/// Reads a residual-load profile in CSV form from any reader.
///
/// # Errors
///
/// Same conditions as [`load_csv`].
pub fn read_csv(
    reader: impl Read,
    context: &str,
    n_units: usize,
) -> Result<Vec<Vec<f64>>, ProfileError> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);

    let headers = rdr.headers().map_err(|e| ProfileError {
        context: context.to_string(),
        message: format!("cannot read header: {e}"),
    })?;
    if headers.len() != n_units + 1 {
        return Err(ProfileError {
            context: context.to_string(),
            message: format!(
                "expected {} columns (timestamp + {n_units} units), found {}",
                n_units + 1,
                headers.len()
            ),
        });
    }

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| ProfileError {
            context: context.to_string(),
            message: format!("row {}: {e}", line + 1),
        })?;
        let mut row = Vec::with_capacity(n_units);
        // Skip the timestamp column.
        for field in record.iter().skip(1) {
            let kw: f64 = field.trim().parse().map_err(|_| ProfileError {
                context: context.to_string(),
                message: format!("row {}: \"{field}\" is not a number", line + 1),
            })?;
            // "nan" and "inf" parse as f64 but poison tolerance checks
            // downstream.
            if !kw.is_finite() {
                return Err(ProfileError {
                    context: context.to_string(),
                    message: format!("row {}: \"{field}\" is not finite", line + 1),
                });
            }
            row.push(kw);
        }
        rows.push(row);
    }
    Ok(rows)
}
