//! # Driven Ports (Outbound)
//!
//! These are the interfaces the execution engine depends on. Adapters
//! implement these traits to provide:
//! - World state and block context
//! - Nested call dispatch
//! - Gas pricing policy
//!
//! Dependencies point INWARD: the engine consumes these traits as black
//! boxes and never names a concrete implementation.

use crate::domain::entities::{BlockContext, CallContext, Log};
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::{StateError, VmError};
use crate::vm::memory::Memory;
use crate::vm::program::Instruction;
use crate::vm::stack::Stack;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Result of a successful `create` dispatch.
///
/// Carries the address of the new account and the output of its
/// initialization run. Installing that output as code is the calling
/// opcode's job, gated on the code-deposit charge.
#[derive(Clone, Debug)]
pub struct Created {
    /// Address of the newly created account.
    pub address: Address,
    /// Output of the initialization run.
    pub output: Bytes,
}

/// Interface to world state, block context, and nested call dispatch.
///
/// The engine reads and writes accounts only through this trait. Call
/// dispatch receives the caller's frame mutably so the implementation can
/// credit unused sub-call gas back to it; the child frame inherits the
/// caller's gas price.
pub trait Environment: Send + Sync {
    /// Get account balance.
    ///
    /// Returns zero for accounts that do not exist.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn balance(&self, address: Address) -> Result<U256, StateError>;

    /// Get contract code (empty for accounts without code).
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn code(&self, address: Address) -> Result<Bytes, StateError>;

    /// Get a storage value (zero if never written).
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn storage(&self, address: Address, key: StorageKey) -> Result<StorageValue, StateError>;

    /// Set a storage value.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn set_storage(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError>;

    /// Credit an account's balance, creating the account if absent.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;

    /// Install code on an account.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError>;

    /// Mark an account deleted.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn delete_account(&mut self, address: Address) -> Result<(), StateError>;

    /// Append a log record emitted by the executing contract.
    fn add_log(&mut self, log: Log);

    /// Block context execution runs against.
    fn block(&self) -> &BlockContext;

    /// Hash of the ancestor block with the given number.
    ///
    /// Returns the zero hash when unknown. Window validation (only the 256
    /// most recent ancestors are visible) is the caller's responsibility.
    fn ancestor_hash(&self, number: u64) -> Hash;

    /// Get code size.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the backing state is unavailable.
    fn code_size(&self, address: Address) -> Result<usize, StateError> {
        Ok(self.code(address)?.len())
    }

    /// Execute a message call against `target`'s code and account.
    ///
    /// Unused gas out of `gas` is credited back to `caller` before
    /// returning. On failure the caller observes the error; state changes
    /// made by the sub-call are rolled back by the implementation.
    ///
    /// # Errors
    ///
    /// Returns the sub-call's fatal error; the calling opcode reports it as
    /// a falsy push rather than propagating.
    fn call(
        &mut self,
        caller: &mut CallContext,
        target: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> Result<Bytes, VmError>;

    /// Execute `target`'s code against the caller's own account and storage.
    ///
    /// # Errors
    ///
    /// Returns the sub-call's fatal error; the calling opcode reports it as
    /// a falsy push rather than propagating.
    fn call_code(
        &mut self,
        caller: &mut CallContext,
        target: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> Result<Bytes, VmError>;

    /// Create a new account and run `init_code` as its initializer.
    ///
    /// Unused gas is credited back to `caller`. The returned output is NOT
    /// installed as code; the calling opcode decides that after charging
    /// the code-deposit cost.
    ///
    /// # Errors
    ///
    /// Returns the initializer's fatal error; the calling opcode reports it
    /// as a falsy push rather than propagating.
    fn create(
        &mut self,
        caller: &mut CallContext,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> Result<Created, VmError>;
}

// =============================================================================
// COST MODEL
// =============================================================================

/// Resources one instruction requires before it may execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepCost {
    /// Gas to charge.
    pub gas: u64,
    /// Memory span in 32-byte words the instruction needs.
    pub memory_words: u64,
}

impl StepCost {
    /// A step that charges nothing and needs no memory.
    pub const FREE: Self = Self {
        gas: 0,
        memory_words: 0,
    };
}

/// Gas pricing policy consulted once per instruction, before dispatch.
///
/// Implementations may peek at the stack to price operand-dependent
/// instructions but must not modify execution state.
pub trait CostModel: Send + Sync {
    /// Price the instruction about to execute.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed operands; the run aborts with it.
    fn step_cost(
        &self,
        instruction: &Instruction,
        stack: &Stack,
        memory: &Memory,
    ) -> Result<StepCost, VmError>;
}

// =============================================================================
// TESTS
// =============================================================================
