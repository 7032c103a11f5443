//! # Domain Layer (Inner Hexagon)
//!
//! Pure business concepts for bytecode execution.
//! NO I/O, NO async, NO external collaborators.
//!
//! Dependencies point INWARD only: adapters and the engine depend on this
//! layer, never the other way around.

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use services::*;
pub use value_objects::*;
