//! Simulation core: balancing algorithm, engine, step types, and KPIs.

pub mod balancer;
pub mod engine;
pub mod kpi;
pub mod types;
