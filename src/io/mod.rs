//! File I/O helpers.

/// CSV export for simulation step results.
pub mod export;
