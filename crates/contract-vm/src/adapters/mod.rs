//! # Adapters Layer (Outer Hexagon)
//!
//! Adapters implement the outbound ports with concrete machinery: a
//! schedule-driven cost model and an in-memory world state for tests and
//! embedders that do not bring their own.

pub mod cost_adapter;
pub mod state_adapter;

pub use cost_adapter::*;
pub use state_adapter::*;
