//! # Core Domain Entities
//!
//! Main business entities for bytecode execution: the per-invocation call
//! frame, the block context served by the environment, and emitted logs.

use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use serde::{Deserialize, Serialize};

// =============================================================================
// CALL CONTEXT
// =============================================================================

/// Per-invocation call frame.
///
/// Owned exclusively by the single execution in progress. Remaining gas is
/// mutated in place as the loop charges each step; the environment credits
/// unused sub-call gas back through [`CallContext::return_gas`].
#[derive(Clone, Debug)]
pub struct CallContext {
    /// Transaction sender (account that initiated the outermost call).
    pub origin: Address,
    /// Current caller (differs from origin in nested calls).
    pub caller: Address,
    /// Account being executed.
    pub address: Address,
    /// Code body being executed.
    pub code: Bytes,
    /// Content hash of `code`, the program-cache key.
    pub code_hash: Hash,
    /// Input data (calldata).
    pub input: Bytes,
    /// Value transferred.
    pub value: U256,
    /// Gas price.
    pub gas_price: U256,
    /// Remaining gas.
    pub gas: u64,
    /// Call depth.
    pub depth: u16,
}

impl CallContext {
    /// Creates a frame for a top-level call.
    #[must_use]
    pub fn new_call(
        origin: Address,
        to: Address,
        code: Bytes,
        code_hash: Hash,
        input: Bytes,
        value: U256,
        gas: u64,
        gas_price: U256,
    ) -> Self {
        Self {
            origin,
            caller: origin,
            address: to,
            code,
            code_hash,
            input,
            value,
            gas_price,
            gas,
            depth: 0,
        }
    }

    /// Creates a child frame for a nested CALL into `target`.
    #[must_use]
    pub fn child_call(
        &self,
        target: Address,
        code: Bytes,
        code_hash: Hash,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> Self {
        Self {
            origin: self.origin,
            caller: self.address,
            address: target,
            code,
            code_hash,
            input,
            value,
            gas_price: self.gas_price,
            gas,
            depth: self.depth.saturating_add(1),
        }
    }

    /// Creates a child frame for CALLCODE: foreign code runs against the
    /// calling account's own balance and storage.
    #[must_use]
    pub fn child_call_code(
        &self,
        code: Bytes,
        code_hash: Hash,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> Self {
        Self {
            origin: self.origin,
            caller: self.address,
            address: self.address,
            code,
            code_hash,
            input,
            value,
            gas_price: self.gas_price,
            gas,
            depth: self.depth.saturating_add(1),
        }
    }

    /// Creates a child frame for CREATE: init code runs as the new account
    /// with empty input.
    #[must_use]
    pub fn child_create(
        &self,
        created: Address,
        init_code: Bytes,
        init_code_hash: Hash,
        gas: u64,
        value: U256,
    ) -> Self {
        Self {
            origin: self.origin,
            caller: self.address,
            address: created,
            code: init_code,
            code_hash: init_code_hash,
            input: Bytes::new(),
            value,
            gas_price: self.gas_price,
            gas,
            depth: self.depth.saturating_add(1),
        }
    }

    /// Deducts `amount` from remaining gas. Returns false (charging nothing)
    /// if the frame cannot afford it.
    pub fn use_gas(&mut self, amount: u64) -> bool {
        if amount > self.gas {
            false
        } else {
            self.gas -= amount;
            true
        }
    }

    /// Credits unused gas back to this frame after a sub-call.
    pub fn return_gas(&mut self, amount: u64) {
        self.gas = self.gas.saturating_add(amount);
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            origin: Address::ZERO,
            caller: Address::ZERO,
            address: Address::ZERO,
            code: Bytes::new(),
            code_hash: Hash::ZERO,
            input: Bytes::new(),
            value: U256::zero(),
            gas_price: U256::zero(),
            gas: 0,
            depth: 0,
        }
    }
}

// =============================================================================
// BLOCK CONTEXT
// =============================================================================

/// Block context served by the environment during execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block number.
    pub number: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Coinbase address (block proposer).
    pub coinbase: Address,
    /// Block difficulty.
    pub difficulty: U256,
    /// Block gas limit.
    pub gas_limit: u64,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            difficulty: U256::zero(),
            gas_limit: 30_000_000,
        }
    }
}

// =============================================================================
// LOG (EVENT)
// =============================================================================

/// Emitted log (event) from contract execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
    /// Block the log was emitted in.
    pub block_number: u64,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes, block_number: u64) -> Self {
        Self {
            address,
            topics,
            data,
            block_number,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
