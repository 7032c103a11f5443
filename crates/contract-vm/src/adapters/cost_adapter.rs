//! # Schedule-Driven Cost Model
//!
//! Default [`CostModel`] implementation. Each step is priced from a
//! [`Schedule`]: the static per-opcode base cost, the dynamic components
//! (exponent width, hashed and copied words, log payloads, requested call
//! gas and value surcharge) read by peeking operands, and quadratic
//! expansion gas for any memory the step grows into.

use primitive_types::U256;

use crate::errors::VmError;
use crate::ports::{CostModel, StepCost};
use crate::vm::gas::Schedule;
use crate::vm::memory::{Memory, WORD_SIZE};
use crate::vm::opcodes::Opcode;
use crate::vm::program::Instruction;
use crate::vm::stack::Stack;
use crate::vm::words;

// =============================================================================
// SCHEDULE COSTS
// =============================================================================

/// Prices each step from a [`Schedule`].
///
/// Operands are peeked, never popped; pricing leaves the stack exactly as
/// it found it. Storage pricing sees only the value being written, not the
/// backing slot, so every non-zero store pays the set rate.
#[derive(Debug, Clone, Default)]
pub struct ScheduleCosts {
    schedule: Schedule,
}

impl ScheduleCosts {
    /// Build a cost model over the given schedule.
    #[must_use]
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }

    /// The backing schedule.
    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }
}

/// Words that must back a memory access of `size` bytes at `offset`.
/// A zero-size access touches nothing and requires none.
fn words_for(offset: U256, size: U256) -> u64 {
    if size.is_zero() {
        return 0;
    }
    let end = words::saturating_u64(offset).saturating_add(words::saturating_u64(size));
    end.div_ceil(WORD_SIZE as u64)
}

impl CostModel for ScheduleCosts {
    fn step_cost(
        &self,
        instruction: &Instruction,
        stack: &Stack,
        memory: &Memory,
    ) -> Result<StepCost, VmError> {
        let Some(op) = instruction.op else {
            // Unrecognized bytes charge nothing; dispatch rejects them.
            return Ok(StepCost::FREE);
        };

        let current_words = memory.word_size() as u64;
        let mut required_words = current_words;
        let mut gas = self.schedule.base_cost(instruction.raw);

        match op {
            Opcode::Exp => {
                gas = gas.saturating_add(self.schedule.exp_cost(stack.peek_at(1)?));
            }
            Opcode::Keccak256 => {
                let size = stack.peek_at(1)?;
                gas = gas.saturating_add(self.schedule.sha3_cost(words::saturating_u64(size)));
                required_words = required_words.max(words_for(stack.peek_at(0)?, size));
            }
            Opcode::CallDataCopy | Opcode::CodeCopy => {
                let size = stack.peek_at(2)?;
                gas = gas.saturating_add(self.schedule.copy_cost(words::saturating_u64(size)));
                required_words = required_words.max(words_for(stack.peek_at(0)?, size));
            }
            Opcode::ExtCodeCopy => {
                let size = stack.peek_at(3)?;
                gas = gas.saturating_add(self.schedule.copy_cost(words::saturating_u64(size)));
                required_words = required_words.max(words_for(stack.peek_at(1)?, size));
            }
            Opcode::MLoad | Opcode::MStore => {
                required_words =
                    required_words.max(words_for(stack.peek_at(0)?, U256::from(WORD_SIZE)));
            }
            Opcode::MStore8 => {
                required_words = required_words.max(words_for(stack.peek_at(0)?, U256::one()));
            }
            Opcode::SStore => {
                let value = stack.peek_at(1)?;
                gas = self.schedule.sstore_cost(U256::zero(), value);
            }
            Opcode::Return => {
                required_words =
                    required_words.max(words_for(stack.peek_at(0)?, stack.peek_at(1)?));
            }
            Opcode::Log0 | Opcode::Log1 | Opcode::Log2 | Opcode::Log3 | Opcode::Log4 => {
                let topics = words::saturating_u64(instruction.data_or_zero());
                let size = stack.peek_at(1)?;
                gas = gas.saturating_add(
                    self.schedule.log_cost(topics, words::saturating_u64(size)),
                );
                required_words = required_words.max(words_for(stack.peek_at(0)?, size));
            }
            Opcode::Create => {
                required_words =
                    required_words.max(words_for(stack.peek_at(1)?, stack.peek_at(2)?));
            }
            Opcode::Call | Opcode::CallCode => {
                gas = gas.saturating_add(words::saturating_u64(stack.peek_at(0)?));
                if !stack.peek_at(2)?.is_zero() {
                    gas = gas.saturating_add(self.schedule.call_value_transfer_gas);
                }
                let input = words_for(stack.peek_at(3)?, stack.peek_at(4)?);
                let output = words_for(stack.peek_at(5)?, stack.peek_at(6)?);
                required_words = required_words.max(input).max(output);
            }
            _ => {}
        }

        gas = gas.saturating_add(
            self.schedule
                .memory_expansion_cost(current_words, required_words),
        );

        Ok(StepCost {
            gas,
            memory_words: required_words,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
