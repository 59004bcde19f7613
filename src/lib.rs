//! Multi-unit battery storage dispatch simulator.

/// TOML scenario configuration, presets, and validation.
pub mod config;
pub mod devices;
pub mod io;
/// Residual-load profile sources (CSV import and synthetic generation).
pub mod profile;
/// Balancing core, simulation engine, step types, and KPIs.
pub mod sim;
