//! # Compiled Programs
//!
//! One-pass compilation of raw bytecode into a directly-dispatchable
//! instruction sequence, plus the shared cache that publishes compiled
//! programs keyed by code hash.
//!
//! A `Program` moves through a small state machine: Unknown on creation,
//! Compiling while one thread decodes it, then Ready or Error forever.
//! Failed compilations stay cached so the same bad code is never decoded
//! twice.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::domain::value_objects::{Hash, U256};
use crate::errors::VmError;
use crate::vm::opcodes::Opcode;

/// Maximum compilable bytecode size in bytes.
pub const MAX_CODE_SIZE: usize = 24 * 1024;

// =============================================================================
// INSTRUCTIONS
// =============================================================================

/// A single decoded instruction. Immutable after compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Decoded opcode, `None` for bytes outside the instruction set.
    pub op: Option<Opcode>,
    /// Raw byte the instruction was decoded from.
    pub raw: u8,
    /// Program-counter offset of this instruction in the original code.
    pub pc: u64,
    /// Immediate operand: PUSH data (right-zero-padded at code end),
    /// DUP/SWAP depth, or LOG topic count.
    pub data: Option<U256>,
}

impl Instruction {
    /// Immediate operand, or zero when the instruction carries none.
    #[must_use]
    pub fn data_or_zero(&self) -> U256 {
        self.data.unwrap_or_else(U256::zero)
    }
}

// =============================================================================
// PROGRAM
// =============================================================================

/// Compilation status of a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProgramStatus {
    /// Created but not yet compiled.
    Unknown = 0,
    /// Compilation claimed by a thread and in flight.
    Compiling = 1,
    /// Compiled successfully and runnable.
    Ready = 2,
    /// Compilation failed; the error is recorded permanently.
    Error = 3,
}

impl ProgramStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Compiling,
            2 => Self::Ready,
            3 => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Decoded form of a bytecode body, built by one compilation pass.
#[derive(Debug, Default)]
pub(crate) struct ProgramBody {
    /// Decoded instructions in code order.
    pub instructions: Vec<Instruction>,
    /// Map from program-counter offset to instruction index.
    pub pc_to_index: HashMap<u64, usize>,
    /// Program-counter offsets holding a JUMPDEST marker.
    pub jump_dests: HashSet<u64>,
}

/// A compiled program and its publication state.
///
/// The status is the only mutable part and transitions exactly once from
/// Unknown through Compiling to Ready or Error. The decoded body and any
/// compile error are written before the final status is published, so a
/// reader that observes Ready (or Error) always sees the data behind it.
#[derive(Debug)]
pub struct Program {
    code_hash: Hash,
    status: AtomicU8,
    body: OnceLock<ProgramBody>,
    error: OnceLock<VmError>,
}

impl Program {
    /// Creates a new uncompiled program for the given code hash.
    #[must_use]
    pub fn new(code_hash: Hash) -> Self {
        Self {
            code_hash,
            status: AtomicU8::new(ProgramStatus::Unknown as u8),
            body: OnceLock::new(),
            error: OnceLock::new(),
        }
    }

    /// Hash of the code this program was compiled from.
    #[must_use]
    pub fn code_hash(&self) -> Hash {
        self.code_hash
    }

    /// Current compilation status.
    #[must_use]
    pub fn status(&self) -> ProgramStatus {
        ProgramStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Recorded compile error, if compilation failed.
    #[must_use]
    pub fn error(&self) -> Option<&VmError> {
        self.error.get()
    }

    /// Number of decoded instructions (zero before compilation finishes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.get().map_or(0, |body| body.instructions.len())
    }

    /// True when no instructions have been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `pc` is a valid jump destination.
    #[must_use]
    pub fn is_jump_dest(&self, pc: u64) -> bool {
        self.body
            .get()
            .is_some_and(|body| body.jump_dests.contains(&pc))
    }

    /// Decoded body, available once the status is Ready.
    pub(crate) fn body(&self) -> Option<&ProgramBody> {
        self.body.get()
    }

    /// Claim the Unknown -> Compiling transition. Returns true for the one
    /// caller that wins and must compile.
    fn begin_compile(&self) -> bool {
        self.status
            .compare_exchange(
                ProgramStatus::Unknown as u8,
                ProgramStatus::Compiling as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Publish a successful compilation.
    fn finish(&self, body: ProgramBody) {
        let _ = self.body.set(body);
        self.status.store(ProgramStatus::Ready as u8, Ordering::Release);
    }

    /// Publish a failed compilation.
    fn fail(&self, error: VmError) {
        let _ = self.error.set(error);
        self.status.store(ProgramStatus::Error as u8, Ordering::Release);
    }
}

// =============================================================================
// COMPILATION
// =============================================================================

/// Read `n` bytes of PUSH immediate starting at `start`, right-zero-padded
/// when the code ends mid-immediate.
fn read_push_data(code: &[u8], start: usize, n: usize) -> U256 {
    let mut buf = [0u8; 32];
    let end = (start + n).min(code.len());
    let available = end.saturating_sub(start);
    buf[32 - n..32 - n + available].copy_from_slice(&code[start..end]);
    U256::from_big_endian(&buf)
}

/// Decode a bytecode body in a single pass.
///
/// PUSH immediates are consumed as data and never appear as instructions;
/// DUP/SWAP depths and LOG topic counts are recorded as immediates so the
/// dispatch loop never re-derives them from the opcode byte. JUMPDEST
/// offsets are collected into the valid-destination set. Unrecognized
/// bytes decode to placeholder instructions that fail at execution time.
fn compile_body(code: &[u8]) -> Result<ProgramBody, VmError> {
    if code.len() > MAX_CODE_SIZE {
        return Err(VmError::CodeTooLarge {
            size: code.len(),
            max: MAX_CODE_SIZE,
        });
    }

    let mut body = ProgramBody {
        instructions: Vec::with_capacity(code.len()),
        pc_to_index: HashMap::with_capacity(code.len()),
        jump_dests: HashSet::new(),
    };

    let mut pc = 0usize;
    while pc < code.len() {
        let raw = code[pc];
        let op = Opcode::from_byte(raw);

        body.pc_to_index.insert(pc as u64, body.instructions.len());

        let mut data = None;
        let mut width = 1usize;

        if let Some(op) = op {
            if let Some(n) = op.push_size() {
                data = Some(read_push_data(code, pc + 1, n));
                width += n;
            } else if let Some(depth) = op.dup_depth() {
                data = Some(U256::from(depth));
            } else if let Some(depth) = op.swap_depth() {
                data = Some(U256::from(depth));
            } else if let Some(topics) = op.log_topics() {
                data = Some(U256::from(topics));
            } else if op == Opcode::JumpDest {
                body.jump_dests.insert(pc as u64);
            }
        }

        body.instructions.push(Instruction {
            op,
            raw,
            pc: pc as u64,
            data,
        });
        pc += width;
    }

    Ok(body)
}

// =============================================================================
// PROGRAM CACHE
// =============================================================================

/// Shared cache of compiled programs, keyed by code hash.
///
/// The cache is the only cross-execution shared state in the engine.
/// Lookups take the read path; a miss inserts an empty program under the
/// write lock, and exactly one thread then compiles it. Concurrent callers
/// are handed the same `Arc` immediately, possibly before it is Ready.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: RwLock<HashMap<Hash, Arc<Program>>>,
}

impl ProgramCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            programs: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a cached program.
    #[must_use]
    pub fn get(&self, code_hash: &Hash) -> Option<Arc<Program>> {
        self.programs.read().get(code_hash).cloned()
    }

    /// Status of a cached program, Unknown when absent.
    #[must_use]
    pub fn status(&self, code_hash: &Hash) -> ProgramStatus {
        self.get(code_hash)
            .map_or(ProgramStatus::Unknown, |program| program.status())
    }

    /// Register a program, replacing any cached entry for its hash.
    pub fn insert(&self, program: Arc<Program>) {
        self.programs.write().insert(program.code_hash(), program);
    }

    /// Number of cached programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.read().len()
    }

    /// True when nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.read().is_empty()
    }

    /// Fetch the program for `code_hash`, compiling `code` on first sight.
    ///
    /// Never blocks on another thread's compilation: the caller either wins
    /// the compile and returns a Ready/Error program, or returns the shared
    /// entry as-is, which may still be Compiling.
    pub fn get_or_compile(&self, code_hash: Hash, code: &[u8]) -> Arc<Program> {
        let program = if let Some(program) = self.get(&code_hash) {
            program
        } else {
            let mut programs = self.programs.write();
            Arc::clone(
                programs
                    .entry(code_hash)
                    .or_insert_with(|| Arc::new(Program::new(code_hash))),
            )
        };

        if program.begin_compile() {
            match compile_body(code) {
                Ok(body) => program.finish(body),
                Err(error) => program.fail(error),
            }
        }
        program
    }
}

// =============================================================================
// TESTS
// =============================================================================
