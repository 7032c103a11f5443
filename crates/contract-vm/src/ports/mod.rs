//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for the execution engine.
//! These are the interfaces between the engine and the outside world.
//!
//! - **Driven Ports (Outbound)**: `Environment`, `CostModel`
//! - No concrete implementations in this module

pub mod outbound;

pub use outbound::*;
