//! # Contract VM - Compiled Bytecode Execution Engine
//!
//! ## Purpose
//!
//! Executes stack-machine bytecode deterministically under a gas budget.
//! Code is compiled once into a cached program (instruction stream, jump
//! table, push immediates), then interpreted against pluggable world state
//! and a pluggable cost model.
//!
//! ## Execution Safety Limits
//!
//! | Limit | Value | Purpose |
//! |-------|-------|---------|
//! | `max_stack_size` | 1024 | Operand stack bound |
//! | `max_code_size` | 24 KB | Compile-time program cap |
//! | `max_memory_size` | 16 MB | Memory expansion limit |
//! | `max_call_depth` | 1024 | Dispatch recursion bound |
//!
//! ## Engine Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Program cache | `vm/program.rs` | Compile-once bytecode analysis |
//! | Interpreter | `vm/interpreter.rs` | Main execution loop |
//! | Stack | `vm/stack.rs` | 1024-item operand stack |
//! | Memory | `vm/memory.rs` | Word-addressed byte memory |
//! | Gas | `vm/gas.rs` | Cost tables & calculations |
//! | Cost model | `adapters/cost_adapter.rs` | Schedule-driven step pricing |
//! | World state | `adapters/state_adapter.rs` | In-memory environment |
//!
//! ## Usage Example
//!
//! ```ignore
//! use contract_vm::prelude::*;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(Vm::new(Schedule::default(), ScheduleCosts::default()));
//! let mut world = InMemoryEnvironment::new(Arc::clone(&engine));
//!
//! // PUSH1 1, PUSH1 2, ADD, STOP
//! let code = vec![0x60, 0x01, 0x60, 0x02, 0x01, 0x00];
//! let mut frame = CallContext::new_call(
//!     Address::ZERO,
//!     Address::ZERO,
//!     Bytes::from_slice(&code),
//!     keccak256(&code),
//!     Bytes::new(),
//!     U256::zero(),
//!     100_000,
//!     U256::zero(),
//! );
//!
//! let output = engine.execute(&mut world, &mut frame, Bytes::new())?;
//! println!("Gas remaining: {}", frame.gas);
//! println!("Output: {:?}", output);
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod vm;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{BlockContext, CallContext, Log};

    // Value objects
    pub use crate::domain::value_objects::{
        Address, Bytes, Hash, StorageKey, StorageValue, U256,
    };

    // Domain services
    pub use crate::domain::services::{compute_contract_address, empty_code_hash, keccak256};

    // Ports
    pub use crate::ports::outbound::{CostModel, Created, Environment, StepCost};

    // Errors
    pub use crate::errors::{StateError, VmError};

    // Engine components
    pub use crate::vm::{
        gas::Schedule,
        interpreter::Interpreter,
        memory::Memory,
        opcodes::Opcode,
        program::{Program, ProgramCache, ProgramStatus},
        stack::Stack,
        Vm,
    };

    // Adapters
    pub use crate::adapters::{InMemoryEnvironment, ScheduleCosts, MAX_CALL_DEPTH};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
