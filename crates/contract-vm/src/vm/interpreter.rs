//! # Bytecode Interpreter
//!
//! Executes a compiled [`Program`] against one call frame. Every step runs
//! the same sequence: price the instruction through the [`CostModel`],
//! charge the frame, grow memory to the words the step needs, then
//! dispatch. Control flow (jumps, returns, termination) is resolved in the
//! run loop itself; everything else goes through a single dispatch over the
//! opcode.
//!
//! The interpreter owns the frame's stack and memory. World state, block
//! context, and nested calls are reached only through the [`Environment`]
//! port.

use primitive_types::U256;

use crate::domain::entities::{CallContext, Log};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue};
use crate::errors::VmError;
use crate::ports::{CostModel, Environment};
use crate::vm::gas::Schedule;
use crate::vm::memory::Memory;
use crate::vm::opcodes::Opcode;
use crate::vm::pool::BufferPool;
use crate::vm::program::{Instruction, Program, ProgramBody, ProgramStatus};
use crate::vm::stack::Stack;
use crate::vm::words;

// =============================================================================
// INTERPRETER
// =============================================================================

/// Which account a message call executes against.
enum CallKind {
    /// Run the target's code against the target's account.
    Call,
    /// Run the target's code against the caller's own account.
    CallCode,
}

/// Executes one call frame over a compiled program.
///
/// The buffer pool recycles staging allocations (hash input, copy staging,
/// return-data placement) across instructions within the frame; recycling
/// never changes observable behavior.
pub struct Interpreter<'a, E: Environment, C: CostModel> {
    /// The call frame being executed.
    pub context: &'a mut CallContext,
    env: &'a mut E,
    costs: &'a C,
    schedule: &'a Schedule,
    /// Operand stack.
    pub stack: Stack,
    /// Byte-addressed scratch memory.
    pub memory: Memory,
    pool: BufferPool,
}

impl<'a, E: Environment, C: CostModel> Interpreter<'a, E, C> {
    /// Build an interpreter for one frame.
    pub fn new(
        context: &'a mut CallContext,
        env: &'a mut E,
        costs: &'a C,
        schedule: &'a Schedule,
    ) -> Self {
        Self {
            context,
            env,
            costs,
            schedule,
            stack: Stack::new(),
            memory: Memory::new(),
            pool: BufferPool::default(),
        }
    }

    /// Build an interpreter whose buffer pool retains at most `capacity`
    /// spare buffers. Zero disables recycling.
    pub fn with_pool_capacity(
        context: &'a mut CallContext,
        env: &'a mut E,
        costs: &'a C,
        schedule: &'a Schedule,
        capacity: usize,
    ) -> Self {
        let mut interpreter = Self::new(context, env, costs, schedule);
        interpreter.pool = BufferPool::with_capacity(capacity);
        interpreter
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Run the program to completion and return its output.
    ///
    /// Running off the end of the code terminates cleanly with empty
    /// output, as does STOP.
    ///
    /// # Errors
    ///
    /// Returns the fault that aborted execution: gas exhaustion, stack or
    /// memory violations, invalid jumps or opcodes, or a state-layer
    /// failure. A program that is not `Ready` yields its cached compile
    /// error, or `ProgramNotReady` while compilation is still in flight
    /// elsewhere.
    pub fn run(&mut self, program: &Program) -> Result<Bytes, VmError> {
        match program.status() {
            ProgramStatus::Ready => {}
            ProgramStatus::Error => {
                return Err(program.error().cloned().unwrap_or(VmError::ProgramNotReady));
            }
            ProgramStatus::Unknown | ProgramStatus::Compiling => {
                return Err(VmError::ProgramNotReady);
            }
        }
        let Some(body) = program.body() else {
            return Err(VmError::ProgramNotReady);
        };

        let mut index = 0;
        while index < body.instructions.len() {
            let instruction = &body.instructions[index];

            let step = self.costs.step_cost(instruction, &self.stack, &self.memory)?;
            if !self.context.use_gas(step.gas) {
                return Err(VmError::OutOfGas);
            }
            self.memory.resize_words(step.memory_words)?;

            let Some(op) = instruction.op else {
                return Err(VmError::InvalidOpcode(instruction.raw));
            };

            match op {
                Opcode::Stop => return Ok(Bytes::new()),
                Opcode::Return => return self.op_return(),
                Opcode::SelfDestruct => return self.op_self_destruct(),
                Opcode::Jump => {
                    index = jump_index(body, self.stack.pop()?)?;
                    continue;
                }
                Opcode::JumpI => {
                    let target = self.stack.pop()?;
                    let condition = self.stack.pop()?;
                    // A falsy condition never validates the target.
                    if !condition.is_zero() {
                        index = jump_index(body, target)?;
                        continue;
                    }
                }
                Opcode::JumpDest => {}
                _ => self.step(op, instruction)?,
            }

            index += 1;
        }

        Ok(Bytes::new())
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Execute one non-control-flow instruction.
    fn step(&mut self, op: Opcode, instruction: &Instruction) -> Result<(), VmError> {
        // Whole-family forms carry their width or depth as immediate data.
        if op.is_push() {
            return self.stack.push(instruction.data_or_zero());
        }
        if op.is_dup() {
            return self
                .stack
                .dup(words::saturating_usize(instruction.data_or_zero()));
        }
        if op.is_swap() {
            return self
                .stack
                .swap(words::saturating_usize(instruction.data_or_zero()));
        }
        if op.is_log() {
            return self.op_log(words::saturating_usize(instruction.data_or_zero()));
        }

        match op {
            // =================================================================
            // ARITHMETIC
            // =================================================================
            Opcode::Add => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let (sum, _) = a.overflowing_add(b);
                self.stack.push(sum)?;
            }
            Opcode::Mul => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let (product, _) = a.overflowing_mul(b);
                self.stack.push(product)?;
            }
            Opcode::Sub => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let (difference, _) = a.overflowing_sub(b);
                self.stack.push(difference)?;
            }
            Opcode::Div => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let quotient = if b.is_zero() { U256::zero() } else { a / b };
                self.stack.push(quotient)?;
            }
            Opcode::SDiv => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(words::signed_div(a, b))?;
            }
            Opcode::Mod => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let remainder = if b.is_zero() { U256::zero() } else { a % b };
                self.stack.push(remainder)?;
            }
            Opcode::SMod => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(words::signed_mod(a, b))?;
            }
            Opcode::AddMod => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let modulus = self.stack.pop()?;
                let result = if modulus.is_zero() {
                    U256::zero()
                } else {
                    let wide = words::u256_to_u512(a) + words::u256_to_u512(b);
                    words::u512_to_u256(wide % words::u256_to_u512(modulus))
                };
                self.stack.push(result)?;
            }
            Opcode::MulMod => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let modulus = self.stack.pop()?;
                let result = if modulus.is_zero() {
                    U256::zero()
                } else {
                    let wide = words::u256_to_u512(a) * words::u256_to_u512(b);
                    words::u512_to_u256(wide % words::u256_to_u512(modulus))
                };
                self.stack.push(result)?;
            }
            Opcode::Exp => {
                let base = self.stack.pop()?;
                let exponent = self.stack.pop()?;
                self.stack.push(words::exp_by_squaring(base, exponent))?;
            }
            Opcode::SignExtend => {
                let index = self.stack.pop()?;
                // An index of 31 or more leaves the value operand in place.
                if index < U256::from(31) {
                    let value = self.stack.pop()?;
                    self.stack.push(words::sign_extend(index, value))?;
                }
            }

            // =================================================================
            // COMPARISON & BITWISE
            // =================================================================
            Opcode::Lt => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(words::bool_to_word(a < b))?;
            }
            Opcode::Gt => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(words::bool_to_word(a > b))?;
            }
            Opcode::SLt => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(words::bool_to_word(words::signed_lt(a, b)))?;
            }
            Opcode::SGt => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(words::bool_to_word(words::signed_lt(b, a)))?;
            }
            Opcode::Eq => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(words::bool_to_word(a == b))?;
            }
            Opcode::IsZero => {
                let a = self.stack.pop()?;
                self.stack.push(words::bool_to_word(a.is_zero()))?;
            }
            Opcode::And => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a & b)?;
            }
            Opcode::Or => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a | b)?;
            }
            Opcode::Xor => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a ^ b)?;
            }
            Opcode::Not => {
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }
            Opcode::Byte => {
                let index = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(words::byte_at(index, value))?;
            }

            // =================================================================
            // HASHING
            // =================================================================
            Opcode::Keccak256 => {
                let offset = self.stack.pop()?;
                let size = self.stack.pop()?;
                let mut buf = self.pool.acquire();
                self.memory.read_into(
                    words::saturating_usize(offset),
                    words::saturating_usize(size),
                    &mut buf,
                );
                let hash = keccak256(&buf);
                self.pool.release(buf);
                self.stack.push(hash.to_word())?;
            }

            // =================================================================
            // ENVIRONMENTAL INFORMATION
            // =================================================================
            Opcode::Address => {
                self.stack.push(self.context.address.to_word())?;
            }
            Opcode::Balance => {
                let address = Address::from_word(self.stack.pop()?);
                let balance = self.env.balance(address)?;
                self.stack.push(balance)?;
            }
            Opcode::Origin => {
                self.stack.push(self.context.origin.to_word())?;
            }
            Opcode::Caller => {
                self.stack.push(self.context.caller.to_word())?;
            }
            Opcode::CallValue => {
                self.stack.push(self.context.value)?;
            }
            Opcode::CallDataLoad => {
                let offset = self.stack.pop()?;
                let mut buf = self.pool.acquire();
                words::data_slice_into(
                    self.context.input.as_slice(),
                    offset,
                    U256::from(32),
                    &mut buf,
                );
                let word = U256::from_big_endian(&buf);
                self.pool.release(buf);
                self.stack.push(word)?;
            }
            Opcode::CallDataSize => {
                self.stack.push(U256::from(self.context.input.len()))?;
            }
            Opcode::CallDataCopy => {
                let mem_offset = words::saturating_usize(self.stack.pop()?);
                let data_offset = self.stack.pop()?;
                let size = self.stack.pop()?;
                let mut buf = self.pool.acquire();
                words::data_slice_into(self.context.input.as_slice(), data_offset, size, &mut buf);
                self.memory.write_bytes(mem_offset, &buf)?;
                self.pool.release(buf);
            }
            Opcode::CodeSize => {
                self.stack.push(U256::from(self.context.code.len()))?;
            }
            Opcode::CodeCopy => {
                let mem_offset = words::saturating_usize(self.stack.pop()?);
                let code_offset = self.stack.pop()?;
                let size = self.stack.pop()?;
                let mut buf = self.pool.acquire();
                words::data_slice_into(self.context.code.as_slice(), code_offset, size, &mut buf);
                self.memory.write_bytes(mem_offset, &buf)?;
                self.pool.release(buf);
            }
            Opcode::GasPrice => {
                self.stack.push(self.context.gas_price)?;
            }
            Opcode::ExtCodeSize => {
                let address = Address::from_word(self.stack.pop()?);
                let size = self.env.code_size(address)?;
                self.stack.push(U256::from(size))?;
            }
            Opcode::ExtCodeCopy => {
                let address = Address::from_word(self.stack.pop()?);
                let mem_offset = words::saturating_usize(self.stack.pop()?);
                let code_offset = self.stack.pop()?;
                let size = self.stack.pop()?;
                let code = self.env.code(address)?;
                let mut buf = self.pool.acquire();
                words::data_slice_into(code.as_slice(), code_offset, size, &mut buf);
                self.memory.write_bytes(mem_offset, &buf)?;
                self.pool.release(buf);
            }

            // =================================================================
            // BLOCK INFORMATION
            // =================================================================
            Opcode::BlockHash => {
                let number = self.stack.pop()?;
                let current = U256::from(self.env.block().number);
                // Only the 256 most recent ancestors are visible.
                let hash = if number < current
                    && number >= current.saturating_sub(U256::from(256))
                {
                    self.env.ancestor_hash(number.low_u64())
                } else {
                    Hash::ZERO
                };
                self.stack.push(hash.to_word())?;
            }
            Opcode::Coinbase => {
                self.stack.push(self.env.block().coinbase.to_word())?;
            }
            Opcode::Timestamp => {
                self.stack.push(U256::from(self.env.block().timestamp))?;
            }
            Opcode::Number => {
                self.stack.push(U256::from(self.env.block().number))?;
            }
            Opcode::Difficulty => {
                self.stack.push(self.env.block().difficulty)?;
            }
            Opcode::GasLimit => {
                self.stack.push(U256::from(self.env.block().gas_limit))?;
            }

            // =================================================================
            // STACK, MEMORY, STORAGE
            // =================================================================
            Opcode::Pop => {
                self.stack.pop()?;
            }
            Opcode::MLoad => {
                let offset = words::saturating_usize(self.stack.pop()?);
                let word = self.memory.read_word(offset);
                self.stack.push(U256::from_big_endian(&word))?;
            }
            Opcode::MStore => {
                let offset = words::saturating_usize(self.stack.pop()?);
                let value = self.stack.pop()?;
                let mut word = [0u8; 32];
                value.to_big_endian(&mut word);
                self.memory.write_word(offset, &word)?;
            }
            Opcode::MStore8 => {
                let offset = words::saturating_usize(self.stack.pop()?);
                let value = self.stack.pop()?;
                self.memory.write_byte(offset, value.byte(0))?;
            }
            Opcode::SLoad => {
                let key = StorageKey::from_u256(self.stack.pop()?);
                let value = self.env.storage(self.context.address, key)?;
                self.stack.push(value.to_u256())?;
            }
            Opcode::SStore => {
                let key = StorageKey::from_u256(self.stack.pop()?);
                let value = StorageValue::from_u256(self.stack.pop()?);
                self.env.set_storage(self.context.address, key, value)?;
            }
            Opcode::Pc => {
                self.stack.push(U256::from(instruction.pc))?;
            }
            Opcode::MSize => {
                self.stack.push(U256::from(self.memory.len()))?;
            }
            Opcode::Gas => {
                self.stack.push(U256::from(self.context.gas))?;
            }

            // =================================================================
            // SYSTEM OPERATIONS
            // =================================================================
            Opcode::Create => self.op_create()?,
            Opcode::Call => self.op_call(CallKind::Call)?,
            Opcode::CallCode => self.op_call(CallKind::CallCode)?,

            // Control flow and termination never dispatch here; the run
            // loop consumes them first.
            _ => return Err(VmError::InvalidOpcode(instruction.raw)),
        }

        Ok(())
    }

    // =========================================================================
    // SYSTEM OPERATION BODIES
    // =========================================================================

    /// RETURN: hand back a memory region as the frame's output.
    fn op_return(&mut self) -> Result<Bytes, VmError> {
        let offset = self.stack.pop()?;
        let size = self.stack.pop()?;
        let output = self.memory.read_bytes(
            words::saturating_usize(offset),
            words::saturating_usize(size),
        );
        Ok(Bytes::from_vec(output))
    }

    /// SELFDESTRUCT: move the full balance to the beneficiary, delete the
    /// executing account, terminate with empty output.
    fn op_self_destruct(&mut self) -> Result<Bytes, VmError> {
        let beneficiary = Address::from_word(self.stack.pop()?);
        let executing = self.context.address;
        let balance = self.env.balance(executing)?;
        self.env.add_balance(beneficiary, balance)?;
        self.env.delete_account(executing)?;
        Ok(Bytes::new())
    }

    /// LOG0..LOG4: record a log with `topics` topics and a memory region
    /// as payload, stamped with the current block number.
    fn op_log(&mut self, topics: usize) -> Result<(), VmError> {
        let offset = self.stack.pop()?;
        let size = self.stack.pop()?;
        let mut topic_hashes = Vec::with_capacity(topics);
        for _ in 0..topics {
            topic_hashes.push(Hash::from_word(self.stack.pop()?));
        }
        let data = self.memory.read_bytes(
            words::saturating_usize(offset),
            words::saturating_usize(size),
        );
        let log = Log::new(
            self.context.address,
            topic_hashes,
            Bytes::from_vec(data),
            self.env.block().number,
        );
        self.env.add_log(log);
        Ok(())
    }

    /// CALL / CALLCODE: dispatch a nested message call.
    ///
    /// A value transfer grants the callee a stipend on top of the
    /// requested gas. Success pushes one and places the output; failure
    /// pushes zero and leaves memory alone. State-layer faults are the
    /// only sub-call errors that propagate.
    fn op_call(&mut self, kind: CallKind) -> Result<(), VmError> {
        let gas = words::saturating_u64(self.stack.pop()?);
        let target = Address::from_word(self.stack.pop()?);
        let value = self.stack.pop()?;
        let in_offset = self.stack.pop()?;
        let in_size = self.stack.pop()?;
        let ret_offset = words::saturating_usize(self.stack.pop()?);
        let ret_size = words::saturating_usize(self.stack.pop()?);

        let input = Bytes::from_vec(self.memory.read_bytes(
            words::saturating_usize(in_offset),
            words::saturating_usize(in_size),
        ));

        let mut forwarded = gas;
        if !value.is_zero() {
            forwarded = forwarded.saturating_add(self.schedule.call_stipend);
        }

        let result = match kind {
            CallKind::Call => self.env.call(self.context, target, input, forwarded, value),
            CallKind::CallCode => self
                .env
                .call_code(self.context, target, input, forwarded, value),
        };

        match result {
            Ok(output) => {
                if !output.is_empty() && ret_size > 0 {
                    let mut staged = self.pool.acquire();
                    staged.extend_from_slice(output.as_slice());
                    staged.resize(ret_size, 0);
                    self.memory.write_bytes(ret_offset, &staged)?;
                    self.pool.release(staged);
                }
                self.stack.push(U256::one())?;
            }
            Err(error) if error.is_environment() => return Err(error),
            Err(_) => {
                self.stack.push(U256::zero())?;
            }
        }
        Ok(())
    }

    /// CREATE: hand all remaining gas to an initializer run, then charge
    /// the code deposit out of whatever came back.
    ///
    /// The new address is pushed whenever the initializer succeeds; its
    /// output becomes code only if the deposit is affordable. Failure
    /// pushes zero.
    fn op_create(&mut self) -> Result<(), VmError> {
        let value = self.stack.pop()?;
        let offset = self.stack.pop()?;
        let size = self.stack.pop()?;

        let init_code = Bytes::from_vec(self.memory.read_bytes(
            words::saturating_usize(offset),
            words::saturating_usize(size),
        ));

        // The initializer may spend everything; unused gas comes back
        // through the frame.
        let gas = self.context.gas;
        self.context.use_gas(gas);

        match self.env.create(self.context, init_code, gas, value) {
            Ok(created) => {
                let deposit = self
                    .schedule
                    .create_data_gas
                    .saturating_mul(created.output.len() as u64);
                if self.context.use_gas(deposit) {
                    self.env.set_code(created.address, created.output)?;
                }
                self.stack.push(created.address.to_word())?;
            }
            Err(error) if error.is_environment() => return Err(error),
            Err(_) => {
                self.stack.push(U256::zero())?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// JUMP RESOLUTION
// =============================================================================

/// Map a jump target to an instruction index.
///
/// A valid target fits in 64 bits, lands on a JUMPDEST, and starts an
/// instruction; immediate bytes are not addressable.
fn jump_index(body: &ProgramBody, target: U256) -> Result<usize, VmError> {
    if target.bits() > 64 {
        return Err(VmError::InvalidJump(target));
    }
    let pc = target.low_u64();
    if !body.jump_dests.contains(&pc) {
        return Err(VmError::InvalidJump(target));
    }
    body.pc_to_index
        .get(&pc)
        .copied()
        .ok_or(VmError::InvalidJump(target))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::adapters::cost_adapter::ScheduleCosts;
    use crate::domain::entities::BlockContext;
    use crate::domain::services;
    use crate::errors::StateError;
    use crate::ports::Created;
    use crate::vm::program::ProgramCache;

    // =========================================================================
    // TEST ENVIRONMENT
    // =========================================================================

    #[derive(Default)]
    struct TestEnv {
        balances: HashMap<Address, U256>,
        codes: HashMap<Address, Bytes>,
        storage: HashMap<(Address, StorageKey), StorageValue>,
        logs: Vec<Log>,
        block: BlockContext,
        ancestors: HashMap<u64, Hash>,
        deleted: Vec<Address>,
        installed: Vec<(Address, Bytes)>,
        calls_seen: Vec<(Address, Vec<u8>, u64, U256)>,
        call_result: Option<Result<Vec<u8>, VmError>>,
        call_refund: u64,
        create_result: Option<Result<(Address, Vec<u8>), VmError>>,
        create_refund: u64,
    }

    impl Environment for TestEnv {
        fn balance(&self, address: Address) -> Result<U256, StateError> {
            Ok(self.balances.get(&address).copied().unwrap_or_default())
        }

        fn code(&self, address: Address) -> Result<Bytes, StateError> {
            Ok(self.codes.get(&address).cloned().unwrap_or_default())
        }

        fn storage(&self, address: Address, key: StorageKey) -> Result<StorageValue, StateError> {
            Ok(self.storage.get(&(address, key)).copied().unwrap_or_default())
        }

        fn set_storage(
            &mut self,
            address: Address,
            key: StorageKey,
            value: StorageValue,
        ) -> Result<(), StateError> {
            self.storage.insert((address, key), value);
            Ok(())
        }

        fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
            let entry = self.balances.entry(address).or_default();
            *entry = entry.overflowing_add(amount).0;
            Ok(())
        }

        fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
            self.installed.push((address, code.clone()));
            self.codes.insert(address, code);
            Ok(())
        }

        fn delete_account(&mut self, address: Address) -> Result<(), StateError> {
            self.deleted.push(address);
            self.balances.remove(&address);
            Ok(())
        }

        fn add_log(&mut self, log: Log) {
            self.logs.push(log);
        }

        fn block(&self) -> &BlockContext {
            &self.block
        }

        fn ancestor_hash(&self, number: u64) -> Hash {
            self.ancestors.get(&number).copied().unwrap_or(Hash::ZERO)
        }

        fn call(
            &mut self,
            caller: &mut CallContext,
            target: Address,
            input: Bytes,
            gas: u64,
            value: U256,
        ) -> Result<Bytes, VmError> {
            self.calls_seen.push((target, input.into_vec(), gas, value));
            caller.return_gas(self.call_refund);
            match self.call_result.clone().expect("no scripted call result") {
                Ok(output) => Ok(Bytes::from_vec(output)),
                Err(error) => Err(error),
            }
        }

        fn call_code(
            &mut self,
            caller: &mut CallContext,
            target: Address,
            input: Bytes,
            gas: u64,
            value: U256,
        ) -> Result<Bytes, VmError> {
            self.call(caller, target, input, gas, value)
        }

        fn create(
            &mut self,
            caller: &mut CallContext,
            _init_code: Bytes,
            _gas: u64,
            _value: U256,
        ) -> Result<Created, VmError> {
            caller.return_gas(self.create_refund);
            match self
                .create_result
                .clone()
                .expect("no scripted create result")
            {
                Ok((address, output)) => Ok(Created {
                    address,
                    output: Bytes::from_vec(output),
                }),
                Err(error) => Err(error),
            }
        }
    }

    // =========================================================================
    // HARNESS
    // =========================================================================

    fn compiled(code: &[u8]) -> Arc<Program> {
        let cache = ProgramCache::new();
        cache.get_or_compile(services::keccak256(code), code)
    }

    fn context_with_gas(gas: u64) -> CallContext {
        CallContext {
            gas,
            ..CallContext::default()
        }
    }

    fn run_code(
        code: &[u8],
        gas: u64,
        env: &mut TestEnv,
    ) -> (Result<Bytes, VmError>, CallContext, Vec<U256>) {
        let program = compiled(code);
        let mut context = context_with_gas(gas);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, env, &costs, &schedule);
        let result = interpreter.run(&program);
        let stack = interpreter.stack.as_slice().to_vec();
        drop(interpreter);
        (result, context, stack)
    }

    // =========================================================================
    // BASIC EXECUTION
    // =========================================================================

    #[test]
    fn test_push_add_stop() {
        let mut env = TestEnv::default();
        // PUSH1 1, PUSH1 2, ADD, STOP
        let (result, context, stack) =
            run_code(&[0x60, 0x01, 0x60, 0x02, 0x01, 0x00], 100, &mut env);
        assert!(result.unwrap().is_empty());
        assert_eq!(stack, vec![U256::from(3)]);
        assert_eq!(context.gas, 91);
    }

    #[test]
    fn test_running_off_the_end_stops() {
        let mut env = TestEnv::default();
        let (result, _, stack) = run_code(&[0x60, 0x01], 100, &mut env);
        assert!(result.unwrap().is_empty());
        assert_eq!(stack, vec![U256::one()]);
    }

    #[test]
    fn test_truncated_push_is_right_padded() {
        let mut env = TestEnv::default();
        // PUSH2 with only one immediate byte present
        let (result, _, stack) = run_code(&[0x61, 0xAB], 100, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::from(0xAB00)]);
    }

    #[test]
    fn test_out_of_gas_charges_nothing() {
        let mut env = TestEnv::default();
        let (result, context, stack) = run_code(&[0x60, 0x01], 2, &mut env);
        assert!(matches!(result, Err(VmError::OutOfGas)));
        assert_eq!(context.gas, 2);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_unrecognized_byte_fails_dispatch() {
        let mut env = TestEnv::default();
        let (result, context, _) = run_code(&[0xFE], 100, &mut env);
        assert!(matches!(result, Err(VmError::InvalidOpcode(0xFE))));
        assert_eq!(context.gas, 100);
    }

    #[test]
    fn test_stale_program_is_rejected() {
        let mut env = TestEnv::default();
        let program = Program::new(Hash::ZERO);
        let mut context = context_with_gas(100);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        assert!(matches!(
            interpreter.run(&program),
            Err(VmError::ProgramNotReady)
        ));
    }

    #[test]
    fn test_failed_compile_surfaces_its_error() {
        let mut env = TestEnv::default();
        let oversized = vec![0u8; crate::vm::program::MAX_CODE_SIZE + 1];
        let (result, _, _) = run_code(&oversized, 100, &mut env);
        assert!(matches!(result, Err(VmError::CodeTooLarge { .. })));
    }

    // =========================================================================
    // ARITHMETIC & LOGIC
    // =========================================================================

    #[test]
    fn test_division_by_zero_yields_zero() {
        let mut env = TestEnv::default();
        // PUSH1 0 (divisor), PUSH1 5 (dividend), DIV
        let (_, _, stack) = run_code(&[0x60, 0x00, 0x60, 0x05, 0x04], 100, &mut env);
        assert_eq!(stack, vec![U256::zero()]);

        // PUSH1 0, PUSH1 5, MOD
        let (_, _, stack) = run_code(&[0x60, 0x00, 0x60, 0x05, 0x06], 100, &mut env);
        assert_eq!(stack, vec![U256::zero()]);
    }

    #[test]
    fn test_subtraction_wraps() {
        let mut env = TestEnv::default();
        // PUSH1 1 (subtrahend), PUSH1 0 (minuend), SUB: 0 - 1 wraps to MAX
        let (_, _, stack) = run_code(&[0x60, 0x01, 0x60, 0x00, 0x03], 100, &mut env);
        assert_eq!(stack, vec![U256::MAX]);
    }

    #[test]
    fn test_sign_extend_widens_negative_byte() {
        let mut env = TestEnv::default();
        // PUSH1 0xFF, PUSH1 0, SIGNEXTEND: byte 0 sign bit set, extend to MAX
        let (_, _, stack) = run_code(&[0x60, 0xFF, 0x60, 0x00, 0x0B], 100, &mut env);
        assert_eq!(stack, vec![U256::MAX]);
    }

    #[test]
    fn test_sign_extend_oversized_index_keeps_value() {
        let mut env = TestEnv::default();
        // PUSH1 0xFF, PUSH1 31, SIGNEXTEND: index 31 pops nothing further
        let (_, _, stack) = run_code(&[0x60, 0xFF, 0x60, 0x1F, 0x0B], 100, &mut env);
        assert_eq!(stack, vec![U256::from(0xFF)]);
    }

    #[test]
    fn test_comparisons_and_not() {
        let mut env = TestEnv::default();
        // PUSH1 2, PUSH1 1, LT: 1 < 2
        let (_, _, stack) = run_code(&[0x60, 0x02, 0x60, 0x01, 0x10], 100, &mut env);
        assert_eq!(stack, vec![U256::one()]);

        // PUSH1 0, NOT
        let (_, _, stack) = run_code(&[0x60, 0x00, 0x19], 100, &mut env);
        assert_eq!(stack, vec![U256::MAX]);
    }

    #[test]
    fn test_byte_extraction() {
        let mut env = TestEnv::default();
        // PUSH2 0xABCD (value), PUSH1 31 (index), BYTE: lowest byte
        let (_, _, stack) = run_code(&[0x61, 0xAB, 0xCD, 0x60, 0x1F, 0x1A], 100, &mut env);
        assert_eq!(stack, vec![U256::from(0xCD)]);

        // Index past the word yields zero
        let (_, _, stack) = run_code(&[0x61, 0xAB, 0xCD, 0x60, 0x20, 0x1A], 100, &mut env);
        assert_eq!(stack, vec![U256::zero()]);
    }

    #[test]
    fn test_dup_and_swap_families() {
        let mut env = TestEnv::default();
        // PUSH1 1, PUSH1 2, DUP2, SWAP1
        let (_, _, stack) = run_code(&[0x60, 0x01, 0x60, 0x02, 0x81, 0x90], 100, &mut env);
        assert_eq!(stack, vec![U256::one(), U256::one(), U256::from(2)]);
    }

    // =========================================================================
    // CONTROL FLOW
    // =========================================================================

    #[test]
    fn test_jump_to_jumpdest() {
        let mut env = TestEnv::default();
        // PUSH1 4, JUMP, STOP, JUMPDEST, PUSH1 7, STOP
        let code = [0x60, 0x04, 0x56, 0x00, 0x5B, 0x60, 0x07, 0x00];
        let (result, context, stack) = run_code(&code, 100, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::from(7)]);
        assert_eq!(context.gas, 100 - 3 - 8 - 1 - 3);
    }

    #[test]
    fn test_jump_to_non_jumpdest_fails() {
        let mut env = TestEnv::default();
        // PUSH1 3, JUMP, STOP: target 3 is a STOP, not a JUMPDEST
        let (result, _, _) = run_code(&[0x60, 0x03, 0x56, 0x00], 100, &mut env);
        assert!(matches!(result, Err(VmError::InvalidJump(_))));
    }

    #[test]
    fn test_jump_into_push_immediate_fails() {
        let mut env = TestEnv::default();
        // PUSH2 0x5B5B, PUSH1 1, JUMP: pc 1 is immediate data, not code
        let code = [0x61, 0x5B, 0x5B, 0x60, 0x01, 0x56];
        let (result, _, _) = run_code(&code, 100, &mut env);
        assert!(matches!(result, Err(VmError::InvalidJump(_))));
    }

    #[test]
    fn test_jumpi_taken() {
        let mut env = TestEnv::default();
        // PUSH1 1, PUSH1 6, JUMPI, STOP, JUMPDEST, PUSH1 42, STOP
        let code = [0x60, 0x01, 0x60, 0x06, 0x57, 0x00, 0x5B, 0x60, 0x2A, 0x00];
        let (result, _, stack) = run_code(&code, 100, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::from(0x2A)]);
    }

    #[test]
    fn test_jumpi_falsy_never_validates_target() {
        let mut env = TestEnv::default();
        // PUSH1 0, PUSH1 99, JUMPI, PUSH1 5, STOP: target 99 is out of
        // range but the condition is zero
        let code = [0x60, 0x00, 0x60, 0x63, 0x57, 0x60, 0x05, 0x00];
        let (result, _, stack) = run_code(&code, 100, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::from(5)]);
    }

    #[test]
    fn test_oversized_jump_target_fails() {
        let mut env = TestEnv::default();
        // PUSH32 MAX, JUMP
        let mut code = vec![0x7F];
        code.extend_from_slice(&[0xFF; 32]);
        code.push(0x56);
        let (result, _, _) = run_code(&code, 100, &mut env);
        assert!(matches!(result, Err(VmError::InvalidJump(_))));
    }

    #[test]
    fn test_pc_pushes_instruction_offset() {
        let mut env = TestEnv::default();
        // PC, PC
        let (_, _, stack) = run_code(&[0x58, 0x58], 100, &mut env);
        assert_eq!(stack, vec![U256::zero(), U256::one()]);
    }

    // =========================================================================
    // MEMORY
    // =========================================================================

    #[test]
    fn test_mstore_mload_roundtrip() {
        let mut env = TestEnv::default();
        // PUSH1 42 (value), PUSH1 0 (offset), MSTORE, PUSH1 0, MLOAD, MSIZE
        let code = [0x60, 0x2A, 0x60, 0x00, 0x52, 0x60, 0x00, 0x51, 0x59];
        let (result, context, stack) = run_code(&code, 100, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::from(42), U256::from(32)]);
        // three pushes, MSTORE at 3 + 3 expansion, MLOAD at 3, MSIZE at 2
        assert_eq!(context.gas, 100 - 9 - 6 - 3 - 2);
    }

    #[test]
    fn test_mstore8_writes_low_byte() {
        let mut env = TestEnv::default();
        let program = compiled(&[0x61, 0x12, 0x34, 0x60, 0x00, 0x53]);
        let mut context = context_with_gas(100);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(interpreter.memory.as_slice()[0], 0x34);
        assert_eq!(interpreter.memory.len(), 32);
    }

    // =========================================================================
    // HASHING
    // =========================================================================

    #[test]
    fn test_keccak_of_empty_region() {
        let mut env = TestEnv::default();
        // PUSH1 0 (size), PUSH1 0 (offset), KECCAK256
        let (_, _, stack) = run_code(&[0x60, 0x00, 0x60, 0x00, 0x20], 100, &mut env);
        let expected = services::keccak256(&[]).to_word();
        assert_eq!(stack, vec![expected]);
    }

    #[test]
    fn test_keccak_hashes_memory_contents() {
        let mut env = TestEnv::default();
        // PUSH1 42, PUSH1 0, MSTORE, PUSH1 32 (size), PUSH1 0 (offset), KECCAK256
        let code = [0x60, 0x2A, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0x20];
        let (_, _, stack) = run_code(&code, 1_000, &mut env);
        let mut word = [0u8; 32];
        U256::from(42).to_big_endian(&mut word);
        assert_eq!(stack, vec![services::keccak256(&word).to_word()]);
    }

    // =========================================================================
    // ENVIRONMENTAL INFORMATION
    // =========================================================================

    #[test]
    fn test_frame_identity_opcodes() {
        let mut env = TestEnv::default();
        let program = compiled(&[0x30, 0x33, 0x32, 0x34]);
        let mut context = context_with_gas(100);
        context.address = Address([0x11; 20]);
        context.caller = Address([0x22; 20]);
        context.origin = Address([0x33; 20]);
        context.value = U256::from(77);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(
            interpreter.stack.as_slice(),
            &[
                Address([0x11; 20]).to_word(),
                Address([0x22; 20]).to_word(),
                Address([0x33; 20]).to_word(),
                U256::from(77),
            ]
        );
    }

    #[test]
    fn test_calldata_opcodes() {
        let mut env = TestEnv::default();
        // CALLDATASIZE, PUSH1 0, CALLDATALOAD
        let program = compiled(&[0x36, 0x60, 0x00, 0x35]);
        let mut context = context_with_gas(100);
        context.input = Bytes::from_slice(&[0xFF, 0x01]);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        // load is right-padded to a full word
        let mut expected = [0u8; 32];
        expected[0] = 0xFF;
        expected[1] = 0x01;
        assert_eq!(
            interpreter.stack.as_slice(),
            &[U256::from(2), U256::from_big_endian(&expected)]
        );
    }

    #[test]
    fn test_calldatacopy_places_slice() {
        let mut env = TestEnv::default();
        // PUSH1 2 (size), PUSH1 1 (data offset), PUSH1 0 (mem offset), CALLDATACOPY
        let program = compiled(&[0x60, 0x02, 0x60, 0x01, 0x60, 0x00, 0x37]);
        let mut context = context_with_gas(100);
        context.input = Bytes::from_slice(&[0x01, 0x02, 0x03]);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(&interpreter.memory.as_slice()[..2], &[0x02, 0x03]);
    }

    #[test]
    fn test_codecopy_reads_own_code() {
        let mut env = TestEnv::default();
        // PUSH1 3 (size), PUSH1 0 (code offset), PUSH1 0 (mem offset), CODECOPY
        let code = [0x60, 0x03, 0x60, 0x00, 0x60, 0x00, 0x39];
        let program = compiled(&code);
        let mut context = context_with_gas(100);
        context.code = Bytes::from_slice(&code);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(&interpreter.memory.as_slice()[..3], &[0x60, 0x03, 0x60]);
    }

    #[test]
    fn test_external_code_opcodes() {
        let mut env = TestEnv::default();
        let target = Address([0xAA; 20]);
        env.codes
            .insert(target, Bytes::from_slice(&[0x60, 0x01, 0x00]));
        env.balances.insert(target, U256::from(500));

        // PUSH20 target, BALANCE
        let mut code = vec![0x73];
        code.extend_from_slice(&[0xAA; 20]);
        code.push(0x31);
        let (_, _, stack) = run_code(&code, 100, &mut env);
        assert_eq!(stack, vec![U256::from(500)]);

        // PUSH20 target, EXTCODESIZE
        let mut code = vec![0x73];
        code.extend_from_slice(&[0xAA; 20]);
        code.push(0x3B);
        let (_, _, stack) = run_code(&code, 100, &mut env);
        assert_eq!(stack, vec![U256::from(3)]);
    }

    #[test]
    fn test_extcodecopy_places_foreign_code() {
        let mut env = TestEnv::default();
        let target = Address([0xAA; 20]);
        env.codes.insert(target, Bytes::from_slice(&[0xDE, 0xAD]));

        // PUSH1 2 (size), PUSH1 0 (code offset), PUSH1 0 (mem offset),
        // PUSH20 target, EXTCODECOPY
        let mut code = vec![0x60, 0x02, 0x60, 0x00, 0x60, 0x00, 0x73];
        code.extend_from_slice(&[0xAA; 20]);
        code.push(0x3C);
        let program = compiled(&code);
        let mut context = context_with_gas(100);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(&interpreter.memory.as_slice()[..2], &[0xDE, 0xAD]);
    }

    // =========================================================================
    // BLOCK INFORMATION
    // =========================================================================

    #[test]
    fn test_block_info_opcodes() {
        let mut env = TestEnv::default();
        env.block = BlockContext {
            number: 7,
            timestamp: 1_000_000,
            coinbase: Address([0x05; 20]),
            difficulty: U256::from(131_072),
            gas_limit: 8_000_000,
        };
        // COINBASE, TIMESTAMP, NUMBER, DIFFICULTY, GASLIMIT
        let (_, _, stack) = run_code(&[0x41, 0x42, 0x43, 0x44, 0x45], 100, &mut env);
        assert_eq!(
            stack,
            vec![
                Address([0x05; 20]).to_word(),
                U256::from(1_000_000),
                U256::from(7),
                U256::from(131_072),
                U256::from(8_000_000),
            ]
        );
    }

    #[test]
    fn test_blockhash_window() {
        let mut env = TestEnv::default();
        env.block.number = 300;
        let known = Hash([0x42; 32]);
        env.ancestors.insert(299, known);
        env.ancestors.insert(43, Hash([0x43; 32]));

        // PUSH2 299, BLOCKHASH: one behind the head is visible
        let (_, _, stack) = run_code(&[0x61, 0x01, 0x2B, 0x40], 100, &mut env);
        assert_eq!(stack, vec![known.to_word()]);

        // PUSH1 43, BLOCKHASH: older than 256 ancestors, zero
        let (_, _, stack) = run_code(&[0x60, 0x2B, 0x40], 100, &mut env);
        assert_eq!(stack, vec![U256::zero()]);

        // PUSH2 300, BLOCKHASH: the current block is not an ancestor
        let (_, _, stack) = run_code(&[0x61, 0x01, 0x2C, 0x40], 100, &mut env);
        assert_eq!(stack, vec![U256::zero()]);
    }

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[test]
    fn test_storage_roundtrip() {
        let mut env = TestEnv::default();
        // PUSH1 42 (value), PUSH1 1 (key), SSTORE, PUSH1 1, SLOAD
        let code = [0x60, 0x2A, 0x60, 0x01, 0x55, 0x60, 0x01, 0x54];
        let (result, context, stack) = run_code(&code, 30_000, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::from(42)]);
        // three pushes, a fresh store at 20000, a load at 50
        assert_eq!(context.gas, 30_000 - 9 - 20_000 - 50);
        let key = StorageKey::from_u256(U256::one());
        assert_eq!(
            env.storage.get(&(Address::ZERO, key)),
            Some(&StorageValue::from_u256(U256::from(42)))
        );
    }

    #[test]
    fn test_gas_opcode_reports_remaining() {
        let mut env = TestEnv::default();
        let (_, _, stack) = run_code(&[0x5A], 10, &mut env);
        assert_eq!(stack, vec![U256::from(8)]);
    }

    // =========================================================================
    // LOGGING
    // =========================================================================

    #[test]
    fn test_log_captures_topics_and_data() {
        let mut env = TestEnv::default();
        env.block.number = 12;
        // PUSH1 0xAA (topic), PUSH1 32 (size), PUSH1 0 (offset), LOG1
        let code = [0x60, 0xAA, 0x60, 0x20, 0x60, 0x00, 0xA1];
        let program = compiled(&code);
        let mut context = context_with_gas(10_000);
        context.address = Address([0x07; 20]);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        drop(interpreter);

        assert_eq!(env.logs.len(), 1);
        let log = &env.logs[0];
        assert_eq!(log.address, Address([0x07; 20]));
        assert_eq!(log.topics, vec![Hash::from_word(U256::from(0xAA))]);
        assert_eq!(log.data.len(), 32);
        assert_eq!(log.block_number, 12);
    }

    // =========================================================================
    // CALLS
    // =========================================================================

    #[test]
    fn test_call_success_places_output() {
        let mut env = TestEnv::default();
        env.call_result = Some(Ok(vec![0xAA, 0xBB]));
        env.call_refund = 60;

        // ret_size 32, ret_off 0, in_size 0, in_off 0, value 0, to, gas 100
        let code = [
            0x60, 0x20, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0xCC, 0x60, 0x64,
            0xF1,
        ];
        let program = compiled(&code);
        let mut context = context_with_gas(10_000);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(interpreter.stack.as_slice(), &[U256::one()]);
        assert_eq!(&interpreter.memory.as_slice()[..3], &[0xAA, 0xBB, 0x00]);
        drop(interpreter);

        // seven pushes, call base + requested + one word of expansion,
        // then the scripted refund comes back
        assert_eq!(context.gas, 10_000 - 21 - (40 + 100 + 3) + 60);
        let (target, input, forwarded, value) = env.calls_seen[0].clone();
        assert_eq!(target, Address::from_word(U256::from(0xCC)));
        assert!(input.is_empty());
        assert_eq!(forwarded, 100);
        assert!(value.is_zero());
    }

    #[test]
    fn test_call_with_value_grants_stipend() {
        let mut env = TestEnv::default();
        env.call_result = Some(Ok(Vec::new()));

        // ret_size 0, ret_off 0, in_size 0, in_off 0, value 1, to, gas 100
        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x01, 0x60, 0xCC, 0x60, 0x64,
            0xF1,
        ];
        let (result, context, stack) = run_code(&code, 20_000, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::one()]);
        let (_, _, forwarded, value) = env.calls_seen[0].clone();
        assert_eq!(forwarded, 100 + 2_300);
        assert_eq!(value, U256::one());
        // seven pushes, call base + requested + value surcharge
        assert_eq!(context.gas, 20_000 - 21 - (40 + 100 + 9_000));
    }

    #[test]
    fn test_call_failure_pushes_zero_and_leaves_memory() {
        let mut env = TestEnv::default();
        env.call_result = Some(Err(VmError::OutOfGas));

        let code = [
            0x60, 0x20, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0xCC, 0x60, 0x64,
            0xF1,
        ];
        let program = compiled(&code);
        let mut context = context_with_gas(10_000);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(interpreter.stack.as_slice(), &[U256::zero()]);
        assert!(interpreter.memory.as_slice().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn test_call_state_failure_propagates() {
        let mut env = TestEnv::default();
        env.call_result = Some(Err(VmError::StateError(StateError::Unavailable)));

        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0xCC, 0x60, 0x64,
            0xF1,
        ];
        let (result, _, _) = run_code(&code, 10_000, &mut env);
        assert!(matches!(
            result,
            Err(VmError::StateError(StateError::Unavailable))
        ));
    }

    #[test]
    fn test_long_call_output_is_truncated_to_region() {
        let mut env = TestEnv::default();
        env.call_result = Some(Ok(vec![0x11, 0x22, 0x33, 0x44]));

        // ret_size 2: only the first two output bytes land
        let code = [
            0x60, 0x02, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0xCC, 0x60, 0x64,
            0xF1,
        ];
        let program = compiled(&code);
        let mut context = context_with_gas(10_000);
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        interpreter.run(&program).unwrap();
        assert_eq!(&interpreter.memory.as_slice()[..3], &[0x11, 0x22, 0x00]);
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    #[test]
    fn test_create_installs_code_when_deposit_affordable() {
        let mut env = TestEnv::default();
        let created = Address([0xBE; 20]);
        env.create_result = Some(Ok((created, vec![0x01; 10])));
        env.create_refund = 5_000;

        // PUSH1 0 (size), PUSH1 0 (offset), PUSH1 0 (value), CREATE, STOP
        let code = [0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0xF0, 0x00];
        let (result, context, stack) = run_code(&code, 50_000, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![created.to_word()]);
        // three pushes and the create base, everything else handed to the
        // initializer; 5000 came back and the deposit took 2000
        assert_eq!(context.gas, 3_000);
        assert_eq!(env.installed.len(), 1);
        assert_eq!(env.installed[0].0, created);
        assert_eq!(env.installed[0].1.len(), 10);
    }

    #[test]
    fn test_create_skips_install_when_deposit_unaffordable() {
        let mut env = TestEnv::default();
        let created = Address([0xBE; 20]);
        env.create_result = Some(Ok((created, vec![0x01; 10])));
        env.create_refund = 1_000;

        let code = [0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0xF0, 0x00];
        let (result, context, stack) = run_code(&code, 50_000, &mut env);
        assert!(result.is_ok());
        // the address is still pushed; only the install is skipped
        assert_eq!(stack, vec![created.to_word()]);
        assert_eq!(context.gas, 1_000);
        assert!(env.installed.is_empty());
    }

    #[test]
    fn test_create_failure_pushes_zero() {
        let mut env = TestEnv::default();
        env.create_result = Some(Err(VmError::OutOfGas));

        let code = [0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0xF0, 0x00];
        let (result, context, stack) = run_code(&code, 50_000, &mut env);
        assert!(result.is_ok());
        assert_eq!(stack, vec![U256::zero()]);
        assert_eq!(context.gas, 0);
        assert!(env.installed.is_empty());
    }

    // =========================================================================
    // SELF-DESTRUCT
    // =========================================================================

    #[test]
    fn test_self_destruct_sweeps_balance() {
        let mut env = TestEnv::default();
        let me = Address([0x01; 20]);
        let beneficiary = Address([0x02; 20]);
        env.balances.insert(me, U256::from(100));
        env.balances.insert(beneficiary, U256::from(5));

        // PUSH20 beneficiary, SELFDESTRUCT
        let mut code = vec![0x73];
        code.extend_from_slice(&[0x02; 20]);
        code.push(0xFF);
        let program = compiled(&code);
        let mut context = context_with_gas(100);
        context.address = me;
        let costs = ScheduleCosts::default();
        let schedule = Schedule::default();
        let mut interpreter = Interpreter::new(&mut context, &mut env, &costs, &schedule);
        let output = interpreter.run(&program).unwrap();
        drop(interpreter);

        assert!(output.is_empty());
        assert_eq!(env.balances.get(&beneficiary), Some(&U256::from(105)));
        assert!(!env.balances.contains_key(&me));
        assert_eq!(env.deleted, vec![me]);
        assert_eq!(context.gas, 100 - 3);
    }

    // =========================================================================
    // BUFFER POOL TRANSPARENCY
    // =========================================================================

    #[test]
    fn test_pool_capacity_does_not_change_results() {
        // copy calldata, hash it, store the hash: exercises every pooled path
        let code = [
            0x60, 0x20, 0x60, 0x00, 0x60, 0x00, 0x37, // CALLDATACOPY 32 bytes
            0x60, 0x20, 0x60, 0x00, 0x20, // KECCAK256 over them
            0x60, 0x00, 0x52, // MSTORE the hash
            0x60, 0x00, 0x51, // MLOAD it back
            0x00,
        ];
        let input: Vec<u8> = (0u8..32).collect();

        let mut outcomes = Vec::new();
        for capacity in [0, crate::vm::pool::DEFAULT_POOL_CAPACITY] {
            let mut env = TestEnv::default();
            let program = compiled(&code);
            let mut context = context_with_gas(10_000);
            context.input = Bytes::from_slice(&input);
            let costs = ScheduleCosts::default();
            let schedule = Schedule::default();
            let mut interpreter = Interpreter::with_pool_capacity(
                &mut context,
                &mut env,
                &costs,
                &schedule,
                capacity,
            );
            let result = interpreter.run(&program);
            let top = interpreter.stack.peek().unwrap();
            drop(interpreter);
            outcomes.push((result.unwrap(), context.gas, top));
        }
        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(outcomes[0].2, services::keccak256(&input).to_word());
    }

    // =========================================================================
    // RETURN
    // =========================================================================

    #[test]
    fn test_return_hands_back_memory_region() {
        let mut env = TestEnv::default();
        // PUSH1 42, PUSH1 0, MSTORE, PUSH1 32 (size), PUSH1 0 (offset), RETURN
        let code = [0x60, 0x2A, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3];
        let (result, _, _) = run_code(&code, 100, &mut env);
        let output = result.unwrap();
        assert_eq!(output.len(), 32);
        assert_eq!(output.as_slice()[31], 42);
    }
}
