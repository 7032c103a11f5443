//! # State Adapter
//!
//! In-memory implementation of the [`Environment`] port: accounts, storage,
//! logs, and block context held in plain maps, with call dispatch recursing
//! into a shared [`Vm`]. Backs tests and embedders that do not bring their
//! own state; a production embedder implements the port against its own
//! database instead.

use std::collections::HashMap;
use std::sync::Arc;

use primitive_types::U256;

use crate::adapters::cost_adapter::ScheduleCosts;
use crate::domain::entities::{BlockContext, CallContext, Log};
use crate::domain::services;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue};
use crate::errors::{StateError, VmError};
use crate::ports::outbound::{Created, Environment};
use crate::vm::Vm;

/// Deepest frame a nested call or create may reach.
pub const MAX_CALL_DEPTH: u16 = 1024;

// =============================================================================
// ACCOUNT STATE
// =============================================================================

/// A single account: balance, nonce, code, and its storage slots.
#[derive(Debug, Clone, Default)]
struct Account {
    balance: U256,
    nonce: u64,
    code: Bytes,
    storage: HashMap<StorageKey, StorageValue>,
}

/// Undo record taken before every sub-call.
struct Snapshot {
    accounts: HashMap<Address, Account>,
    log_count: usize,
}

// =============================================================================
// IN-MEMORY ENVIRONMENT
// =============================================================================

/// World state backed by nothing but maps.
///
/// Sub-calls run through the shared engine against `self`, so nested frames
/// observe each other's writes. Every dispatch snapshots the accounts first:
/// a failing sub-call is rolled back, its logs are dropped, and the gas it
/// was handed stays consumed.
pub struct InMemoryEnvironment {
    accounts: HashMap<Address, Account>,
    logs: Vec<Log>,
    block: BlockContext,
    ancestors: HashMap<u64, Hash>,
    engine: Arc<Vm<ScheduleCosts>>,
}

impl InMemoryEnvironment {
    /// Creates an empty world wired to `engine`, with a default block.
    #[must_use]
    pub fn new(engine: Arc<Vm<ScheduleCosts>>) -> Self {
        Self::with_block(engine, BlockContext::default())
    }

    /// Creates an empty world executing against `block`.
    #[must_use]
    pub fn with_block(engine: Arc<Vm<ScheduleCosts>>, block: BlockContext) -> Self {
        Self {
            accounts: HashMap::new(),
            logs: Vec::new(),
            block,
            ancestors: HashMap::new(),
            engine,
        }
    }

    /// Seeds an account balance.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.account_mut(address).balance = balance;
    }

    /// Seeds account code.
    pub fn set_account_code(&mut self, address: Address, code: Bytes) {
        self.account_mut(address).code = code;
    }

    /// Seeds a storage slot.
    pub fn set_storage_value(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.account_mut(address).storage.insert(key, value);
    }

    /// Seeds an ancestor block hash for BLOCKHASH lookups.
    pub fn set_ancestor(&mut self, number: u64, hash: Hash) {
        self.ancestors.insert(number, hash);
    }

    /// Current nonce of an account (zero if absent).
    #[must_use]
    pub fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map_or(0, |account| account.nonce)
    }

    /// Logs accumulated by successful executions so far.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    fn account_mut(&mut self, address: Address) -> &mut Account {
        self.accounts.entry(address).or_default()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.accounts.clone(),
            log_count: self.logs.len(),
        }
    }

    fn rollback(&mut self, snapshot: Snapshot) {
        self.accounts = snapshot.accounts;
        self.logs.truncate(snapshot.log_count);
    }

    /// Moves `value` between accounts. Affordability is checked by the
    /// dispatch methods before any state is touched.
    fn transfer(&mut self, from: Address, to: Address, value: U256) {
        if value.is_zero() {
            return;
        }
        let sender = self.account_mut(from);
        sender.balance = sender.balance.saturating_sub(value);
        let receiver = self.account_mut(to);
        receiver.balance = receiver.balance.overflowing_add(value).0;
    }

    /// Refuses dispatch past the depth cap, handing the forwarded gas back
    /// to the caller frame.
    fn check_depth(&self, caller: &mut CallContext, gas: u64) -> Result<(), VmError> {
        if caller.depth >= MAX_CALL_DEPTH {
            caller.return_gas(gas);
            return Err(VmError::CallDepthExceeded {
                depth: caller.depth.saturating_add(1),
                max: MAX_CALL_DEPTH,
            });
        }
        Ok(())
    }

    /// Refuses a transfer the caller cannot fund, handing the forwarded gas
    /// back to the caller frame.
    fn check_value(&self, caller: &mut CallContext, gas: u64, value: U256) -> Result<(), VmError> {
        let available = self.balance(caller.address)?;
        if value > available {
            caller.return_gas(gas);
            return Err(VmError::InsufficientBalance {
                required: value,
                available,
            });
        }
        Ok(())
    }

    fn run_frame(&mut self, child: &mut CallContext, input: Bytes) -> Result<Bytes, VmError> {
        let engine = Arc::clone(&self.engine);
        engine.execute(self, child, input)
    }
}

// =============================================================================
// ENVIRONMENT PORT
// =============================================================================

impl Environment for InMemoryEnvironment {
    fn balance(&self, address: Address) -> Result<U256, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .map_or_else(U256::zero, |account| account.balance))
    }

    fn code(&self, address: Address) -> Result<Bytes, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .map_or_else(Bytes::new, |account| account.code.clone()))
    }

    fn storage(&self, address: Address, key: StorageKey) -> Result<StorageValue, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or(StorageValue::ZERO))
    }

    fn set_storage(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        self.account_mut(address).storage.insert(key, value);
        Ok(())
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let account = self.account_mut(address);
        account.balance = account.balance.overflowing_add(amount).0;
        Ok(())
    }

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        self.account_mut(address).code = code;
        Ok(())
    }

    fn delete_account(&mut self, address: Address) -> Result<(), StateError> {
        self.accounts.remove(&address);
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
        self.check_depth(caller, gas)?;
        self.check_value(caller, gas, value)?;

        let snapshot = self.snapshot();
        self.transfer(caller.address, target, value);

        let code = self.code(target)?;
        let code_hash = services::keccak256(code.as_slice());
        let mut child = caller.child_call(target, code, code_hash, Bytes::new(), gas, value);

        match self.run_frame(&mut child, input) {
            Ok(output) => {
                caller.return_gas(child.gas);
                Ok(output)
            }
            Err(error) => {
                self.rollback(snapshot);
                Err(error)
            }
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
        self.check_depth(caller, gas)?;
        self.check_value(caller, gas, value)?;

        // Value stays put: the target's code runs against the caller's own
        // account and storage.
        let snapshot = self.snapshot();

        let code = self.code(target)?;
        let code_hash = services::keccak256(code.as_slice());
        let mut child = caller.child_call_code(code, code_hash, Bytes::new(), gas, value);

        match self.run_frame(&mut child, input) {
            Ok(output) => {
                caller.return_gas(child.gas);
                Ok(output)
            }
            Err(error) => {
                self.rollback(snapshot);
                Err(error)
            }
        }
    }

    fn create(
        &mut self,
        caller: &mut CallContext,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> Result<Created, VmError> {
        self.check_depth(caller, gas)?;
        self.check_value(caller, gas, value)?;

        // The creator's nonce advances before the snapshot is taken; a
        // failed initializer still burns the address slot.
        let creator = self.account_mut(caller.address);
        let nonce = creator.nonce;
        creator.nonce += 1;
        let address = services::compute_contract_address(caller.address, nonce);

        let snapshot = self.snapshot();
        self.transfer(caller.address, address, value);

        let init_code_hash = services::keccak256(init_code.as_slice());
        let mut child = caller.child_create(address, init_code, init_code_hash, gas, value);

        match self.run_frame(&mut child, Bytes::new()) {
            Ok(output) => {
                caller.return_gas(child.gas);
                Ok(Created { address, output })
            }
            Err(error) => {
                self.rollback(snapshot);
                Err(error)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
