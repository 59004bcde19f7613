//! Device models for the storage fleet.

/// Stationary battery storage unit model.
pub mod storage;

// Re-export the main types for convenience
pub use storage::StorageUnit;
