//! # Execution Engine
//!
//! The virtual machine proper: the compiled-program cache, the per-frame
//! interpreter, and the machinery they share.
//!
//! ## Components
//!
//! - `interpreter.rs` - Per-frame execution engine
//! - `program.rs` - Compiled programs and the shared cache
//! - `gas.rs` - Gas schedule and static cost table
//! - `stack.rs` - Operand stack
//! - `memory.rs` - Word-granular byte memory
//! - `words.rs` - 256-bit word helpers
//! - `pool.rs` - Staging buffer recycling
//!
//! [`Vm`] ties these together behind one entry point. It is the only
//! place in the engine that emits tracing events; the instruction loop
//! itself stays silent.

pub mod gas;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod pool;
pub mod program;
pub mod stack;
pub mod words;

pub use gas::*;
pub use interpreter::*;
pub use memory::*;
pub use opcodes::*;
pub use pool::*;
pub use program::*;
pub use stack::*;

use tracing::{debug, instrument, warn};

use crate::domain::entities::CallContext;
use crate::domain::value_objects::Bytes;
use crate::errors::VmError;
use crate::ports::{CostModel, Environment};

// =============================================================================
// VM FACADE
// =============================================================================

/// The execution engine: a shared program cache, a gas schedule, and a
/// pricing policy.
///
/// A `Vm` is meant to be long-lived. Programs are compiled once per code
/// hash and reused across executions; all methods take `&self`, so a `Vm`
/// behind an `Arc` serves concurrent frames.
pub struct Vm<C: CostModel> {
    cache: ProgramCache,
    schedule: Schedule,
    costs: C,
}

impl<C: CostModel> Vm<C> {
    /// Build an engine over the given schedule and pricing policy.
    ///
    /// The schedule feeds the dispatch-time charges (call stipend, code
    /// deposit); pricing every other step is the cost model's business.
    pub fn new(schedule: Schedule, costs: C) -> Self {
        Self {
            cache: ProgramCache::new(),
            schedule,
            costs,
        }
    }

    /// The compiled-program cache.
    #[must_use]
    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// The gas schedule in effect.
    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// The pricing policy in effect.
    #[must_use]
    pub fn costs(&self) -> &C {
        &self.costs
    }

    /// Execute the frame's code with the given input.
    ///
    /// The code is compiled and cached on first sight of its hash. When
    /// another thread is still compiling the same hash, the frame is
    /// rejected with `ProgramNotReady` rather than made to wait.
    ///
    /// # Errors
    ///
    /// Returns the fault that aborted the run, or the cached compile error
    /// for code that failed to compile.
    #[instrument(
        skip(self, env, context, input),
        fields(code_hash = %context.code_hash, depth = context.depth)
    )]
    pub fn execute<E: Environment>(
        &self,
        env: &mut E,
        context: &mut CallContext,
        input: Bytes,
    ) -> Result<Bytes, VmError> {
        context.input = input;
        let program = self
            .cache
            .get_or_compile(context.code_hash, context.code.as_slice());

        match program.status() {
            ProgramStatus::Ready => {}
            ProgramStatus::Error => {
                let error = program.error().cloned().unwrap_or(VmError::ProgramNotReady);
                warn!(error = %error, "cached program is poisoned");
                return Err(error);
            }
            ProgramStatus::Unknown | ProgramStatus::Compiling => {
                debug!("program still compiling elsewhere");
                return Err(VmError::ProgramNotReady);
            }
        }

        debug!(
            instructions = program.len(),
            gas = context.gas,
            "executing program"
        );
        let mut interpreter = Interpreter::new(context, env, &self.costs, &self.schedule);
        match interpreter.run(&program) {
            Ok(output) => {
                debug!(
                    gas_remaining = interpreter.context.gas,
                    output_len = output.len(),
                    "execution complete"
                );
                Ok(output)
            }
            Err(error) => {
                debug!(error = %error, "execution aborted");
                Err(error)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
