//! # Gas Schedule
//!
//! Gas cost parameters for contract execution. Every instruction carries a
//! static base cost from a 256-entry table; a handful of instructions add a
//! dynamic component computed from their operands. Memory expansion is
//! charged quadratically on the word count.

use crate::domain::value_objects::U256;

// =============================================================================
// BASE GAS COSTS
// =============================================================================

/// Gas costs for common operations.
pub mod costs {
    /// Zero gas.
    pub const ZERO: u64 = 0;
    /// Quick step (e.g., `ADDRESS`, `POP`).
    pub const QUICK: u64 = 2;
    /// Fastest step (e.g., `ADD`, `PUSH`).
    pub const FASTEST: u64 = 3;
    /// Fast step (e.g., `MUL`, `DIV`).
    pub const FAST: u64 = 5;
    /// Mid step (e.g., `ADDMOD`, `JUMP`).
    pub const MID: u64 = 8;
    /// Slow step (e.g., `JUMPI`, `EXP` base).
    pub const SLOW: u64 = 10;
    /// External account access (e.g., `BALANCE`, `EXTCODESIZE`).
    pub const EXT: u64 = 20;
    /// Jump destination marker.
    pub const JUMPDEST: u64 = 1;

    // Hashing
    /// KECCAK256 base cost.
    pub const SHA3: u64 = 30;
    /// KECCAK256 cost per 32-byte word of input.
    pub const SHA3_WORD: u64 = 6;

    // Exponentiation
    /// EXP cost per byte of exponent.
    pub const EXP_BYTE: u64 = 10;

    // Copy operations
    /// Gas per word for memory copy (CALLDATACOPY, CODECOPY, EXTCODECOPY).
    pub const COPY_WORD: u64 = 3;

    // Storage
    /// Storage read.
    pub const SLOAD: u64 = 50;
    /// SSTORE when setting a zero slot to non-zero.
    pub const SSTORE_SET: u64 = 20_000;
    /// SSTORE when writing to an already non-zero slot.
    pub const SSTORE_RESET: u64 = 5_000;

    // Call costs
    /// Base call cost.
    pub const CALL: u64 = 40;
    /// Surcharge when a call transfers value.
    pub const CALL_VALUE_TRANSFER: u64 = 9_000;
    /// Stipend granted to the callee when value is transferred.
    pub const CALL_STIPEND: u64 = 2_300;

    // Create costs
    /// CREATE opcode base cost.
    pub const CREATE: u64 = 32_000;
    /// Gas per byte of deployed contract code.
    pub const CREATE_DATA: u64 = 200;

    // Log costs
    /// LOG base cost.
    pub const LOG: u64 = 375;
    /// LOG cost per topic.
    pub const LOG_TOPIC: u64 = 375;
    /// LOG cost per byte of data.
    pub const LOG_DATA: u64 = 8;

    // Memory
    /// Linear memory cost per word.
    pub const MEMORY: u64 = 3;
    /// Divisor of the quadratic memory cost term.
    pub const QUAD_COEFF_DIV: u64 = 512;
}

// =============================================================================
// OPCODE GAS COSTS TABLE
// =============================================================================

/// Static gas costs per opcode byte (excludes dynamic costs).
#[rustfmt::skip]
pub const BASE_GAS: [u64; 256] = {
    let mut table = [0u64; 256];

    // Stop and arithmetic
    table[0x00] = costs::ZERO;          // STOP
    table[0x01] = costs::FASTEST;       // ADD
    table[0x02] = costs::FAST;          // MUL
    table[0x03] = costs::FASTEST;       // SUB
    table[0x04] = costs::FAST;          // DIV
    table[0x05] = costs::FAST;          // SDIV
    table[0x06] = costs::FAST;          // MOD
    table[0x07] = costs::FAST;          // SMOD
    table[0x08] = costs::MID;           // ADDMOD
    table[0x09] = costs::MID;           // MULMOD
    table[0x0A] = costs::SLOW;          // EXP (base, dynamic added)
    table[0x0B] = costs::FAST;          // SIGNEXTEND

    // Comparison & bitwise
    table[0x10] = costs::FASTEST;       // LT
    table[0x11] = costs::FASTEST;       // GT
    table[0x12] = costs::FASTEST;       // SLT
    table[0x13] = costs::FASTEST;       // SGT
    table[0x14] = costs::FASTEST;       // EQ
    table[0x15] = costs::FASTEST;       // ISZERO
    table[0x16] = costs::FASTEST;       // AND
    table[0x17] = costs::FASTEST;       // OR
    table[0x18] = costs::FASTEST;       // XOR
    table[0x19] = costs::FASTEST;       // NOT
    table[0x1A] = costs::FASTEST;       // BYTE

    // Hashing
    table[0x20] = costs::SHA3;          // KECCAK256 (base, dynamic added)

    // Environment
    table[0x30] = costs::QUICK;         // ADDRESS
    table[0x31] = costs::EXT;           // BALANCE
    table[0x32] = costs::QUICK;         // ORIGIN
    table[0x33] = costs::QUICK;         // CALLER
    table[0x34] = costs::QUICK;         // CALLVALUE
    table[0x35] = costs::FASTEST;       // CALLDATALOAD
    table[0x36] = costs::QUICK;         // CALLDATASIZE
    table[0x37] = costs::FASTEST;       // CALLDATACOPY (base, dynamic added)
    table[0x38] = costs::QUICK;         // CODESIZE
    table[0x39] = costs::FASTEST;       // CODECOPY (base, dynamic added)
    table[0x3A] = costs::QUICK;         // GASPRICE
    table[0x3B] = costs::EXT;           // EXTCODESIZE
    table[0x3C] = costs::EXT;           // EXTCODECOPY (base, dynamic added)

    // Block info
    table[0x40] = costs::EXT;           // BLOCKHASH
    table[0x41] = costs::QUICK;         // COINBASE
    table[0x42] = costs::QUICK;         // TIMESTAMP
    table[0x43] = costs::QUICK;         // NUMBER
    table[0x44] = costs::QUICK;         // DIFFICULTY
    table[0x45] = costs::QUICK;         // GASLIMIT

    // Stack, memory, storage
    table[0x50] = costs::QUICK;         // POP
    table[0x51] = costs::FASTEST;       // MLOAD
    table[0x52] = costs::FASTEST;       // MSTORE
    table[0x53] = costs::FASTEST;       // MSTORE8
    table[0x54] = costs::SLOAD;         // SLOAD
    table[0x55] = costs::ZERO;          // SSTORE (fully dynamic)
    table[0x56] = costs::MID;           // JUMP
    table[0x57] = costs::SLOW;          // JUMPI
    table[0x58] = costs::QUICK;         // PC
    table[0x59] = costs::QUICK;         // MSIZE
    table[0x5A] = costs::QUICK;         // GAS
    table[0x5B] = costs::JUMPDEST;      // JUMPDEST

    // PUSH1-PUSH32 (0x60-0x7F)
    let mut i = 0x60;
    while i <= 0x7F {
        table[i] = costs::FASTEST;
        i += 1;
    }

    // DUP operations (0x80-0x8F)
    i = 0x80;
    while i <= 0x8F {
        table[i] = costs::FASTEST;
        i += 1;
    }

    // SWAP operations (0x90-0x9F)
    i = 0x90;
    while i <= 0x9F {
        table[i] = costs::FASTEST;
        i += 1;
    }

    // LOG operations (0xA0-0xA4)
    table[0xA0] = costs::LOG;           // LOG0 (base, dynamic added)
    table[0xA1] = costs::LOG;           // LOG1
    table[0xA2] = costs::LOG;           // LOG2
    table[0xA3] = costs::LOG;           // LOG3
    table[0xA4] = costs::LOG;           // LOG4

    // System operations
    table[0xF0] = costs::CREATE;        // CREATE
    table[0xF1] = costs::CALL;          // CALL (base, dynamic added)
    table[0xF2] = costs::CALL;          // CALLCODE (base, dynamic added)
    table[0xF3] = costs::ZERO;          // RETURN
    table[0xFF] = costs::ZERO;          // SELFDESTRUCT

    table
};

// =============================================================================
// SCHEDULE
// =============================================================================

/// Gas cost schedule.
///
/// Bundles the static per-opcode table with the parameters of the dynamic
/// cost components. The default schedule carries the values above; tests
/// construct cheaper or free schedules where pricing is not under test.
#[derive(Clone, Debug)]
pub struct Schedule {
    /// Static gas cost per opcode byte.
    pub base_costs: [u64; 256],
    /// EXP cost per byte of exponent.
    pub exp_byte_gas: u64,
    /// KECCAK256 cost per word of input.
    pub sha3_word_gas: u64,
    /// Copy cost per word (CALLDATACOPY, CODECOPY, EXTCODECOPY).
    pub copy_word_gas: u64,
    /// LOG cost per topic.
    pub log_topic_gas: u64,
    /// LOG cost per byte of data.
    pub log_data_gas: u64,
    /// SSTORE cost when setting a zero slot to non-zero.
    pub sstore_set_gas: u64,
    /// SSTORE cost when writing to a non-zero slot.
    pub sstore_reset_gas: u64,
    /// Surcharge for value-transferring calls.
    pub call_value_transfer_gas: u64,
    /// Stipend granted to the callee on value transfer.
    pub call_stipend: u64,
    /// Gas per byte of code deployed by CREATE.
    pub create_data_gas: u64,
    /// Linear memory cost per word.
    pub memory_gas: u64,
    /// Divisor of the quadratic memory term.
    pub quad_coeff_div: u64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            base_costs: BASE_GAS,
            exp_byte_gas: costs::EXP_BYTE,
            sha3_word_gas: costs::SHA3_WORD,
            copy_word_gas: costs::COPY_WORD,
            log_topic_gas: costs::LOG_TOPIC,
            log_data_gas: costs::LOG_DATA,
            sstore_set_gas: costs::SSTORE_SET,
            sstore_reset_gas: costs::SSTORE_RESET,
            call_value_transfer_gas: costs::CALL_VALUE_TRANSFER,
            call_stipend: costs::CALL_STIPEND,
            create_data_gas: costs::CREATE_DATA,
            memory_gas: costs::MEMORY,
            quad_coeff_div: costs::QUAD_COEFF_DIV,
        }
    }
}

impl Schedule {
    /// Static base cost for an opcode byte.
    #[must_use]
    pub fn base_cost(&self, byte: u8) -> u64 {
        self.base_costs[byte as usize]
    }

    /// Total gas cost of a memory span of `words` 32-byte words.
    ///
    /// Cost = `words^2 / quad_coeff_div + words * memory_gas`, saturating
    /// on overflow so degenerate spans price out rather than wrap.
    #[must_use]
    pub fn memory_cost(&self, words: u64) -> u64 {
        let quadratic = words
            .saturating_mul(words)
            .checked_div(self.quad_coeff_div)
            .unwrap_or(0);
        quadratic.saturating_add(words.saturating_mul(self.memory_gas))
    }

    /// Incremental gas cost of growing memory from `old_words` to `new_words`.
    #[must_use]
    pub fn memory_expansion_cost(&self, old_words: u64, new_words: u64) -> u64 {
        if new_words <= old_words {
            return 0;
        }
        self.memory_cost(new_words) - self.memory_cost(old_words)
    }

    /// Dynamic gas cost of EXP for a given exponent.
    #[must_use]
    pub fn exp_cost(&self, exponent: U256) -> u64 {
        if exponent.is_zero() {
            return 0;
        }
        // Count significant bytes in the exponent
        let byte_size = (256 - u64::from(exponent.leading_zeros())).div_ceil(8);
        self.exp_byte_gas.saturating_mul(byte_size)
    }

    /// Dynamic gas cost of KECCAK256 over `data_size` bytes.
    #[must_use]
    pub fn sha3_cost(&self, data_size: u64) -> u64 {
        self.sha3_word_gas.saturating_mul(data_size.div_ceil(32))
    }

    /// Dynamic gas cost of a copy of `size` bytes.
    #[must_use]
    pub fn copy_cost(&self, size: u64) -> u64 {
        self.copy_word_gas.saturating_mul(size.div_ceil(32))
    }

    /// Dynamic gas cost of a LOG with `topics` topics and `data_size` bytes.
    #[must_use]
    pub fn log_cost(&self, topics: u64, data_size: u64) -> u64 {
        self.log_topic_gas
            .saturating_mul(topics)
            .saturating_add(self.log_data_gas.saturating_mul(data_size))
    }

    /// Gas cost of an SSTORE given the currently stored value and the value
    /// being written. Writing to a zero slot pays the set price; any write
    /// to an occupied slot pays the reset price.
    #[must_use]
    pub fn sstore_cost(&self, current: U256, new: U256) -> u64 {
        if current.is_zero() && !new.is_zero() {
            self.sstore_set_gas
        } else {
            self.sstore_reset_gas
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
