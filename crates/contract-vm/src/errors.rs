//! # Error Types
//!
//! All error types for bytecode execution and program compilation.

use crate::domain::value_objects::{Address, U256};
use thiserror::Error;

// =============================================================================
// VM ERRORS
// =============================================================================

/// Errors that can occur while compiling or running a program.
///
/// Every variant is fatal to the call that produced it: the engine never
/// retries, and partial output is discarded. A nested call observing one of
/// these reports failure to its parent as a falsy stack push.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Execution ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// Stack overflow (>1024 items).
    #[error("stack overflow")]
    StackOverflow,

    /// Stack underflow (pop from empty stack).
    #[error("stack underflow")]
    StackUnderflow,

    /// Byte with no dispatch function reached at execution time.
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Jump target is not a recorded JUMPDEST offset.
    #[error("invalid jump destination: {0}")]
    InvalidJump(U256),

    /// Program looked up while its compilation is still in flight.
    #[error("program not ready")]
    ProgramNotReady,

    /// Bytecode exceeds the compilable size limit.
    #[error("code too large: {size} > {max} bytes")]
    CodeTooLarge { size: usize, max: usize },

    /// Memory expansion would exceed the hard cap.
    #[error("memory limit exceeded: {requested} > {max} bytes")]
    MemoryLimitExceeded { requested: u64, max: u64 },

    /// Call depth exceeded maximum.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded { depth: u16, max: u16 },

    /// Insufficient balance for a value transfer.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    /// State access error surfaced verbatim from the environment.
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

impl VmError {
    /// True for errors produced by the compiler rather than during a run.
    #[must_use]
    pub fn is_compile_time(&self) -> bool {
        matches!(self, Self::CodeTooLarge { .. })
    }

    /// True when the error originated outside the engine, in the
    /// environment's state layer.
    #[must_use]
    pub fn is_environment(&self) -> bool {
        matches!(self, Self::StateError(_))
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from world-state access operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// State not found for an address the caller expected to exist.
    #[error("state not found for address: {0:?}")]
    NotFound(Address),

    /// Backing state subsystem unavailable.
    #[error("state subsystem unavailable")]
    Unavailable,

    /// Other state error.
    #[error("state error: {0}")]
    Other(String),
}

// =============================================================================
// TESTS
// =============================================================================
