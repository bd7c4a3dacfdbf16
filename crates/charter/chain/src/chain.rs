use std::collections::{BTreeMap, HashMap};

use charter_types::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::account::{Account, ComponentKind};
use crate::call::{Call, CallOutput};
use crate::error::ChainError;
use crate::event::{Event, LogEntry};

/// Limits enforced by the execution environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Work units one top-level unit of work may consume. `None` is unbounded.
    pub max_work_per_transaction: Option<u64>,
    /// Maximum number of actions a DAO executes in one call.
    pub max_actions: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_work_per_transaction: None,
            max_actions: 256,
        }
    }
}

/// Block the current unit of work lands in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub number: u64,
    pub timestamp: DateTime<Utc>,
}

impl BlockContext {
    fn genesis() -> Self {
        Self {
            number: 0,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug)]
struct WorldState {
    accounts: BTreeMap<Address, Account>,
    nonces: HashMap<Address, u64>,
    logs: Vec<LogEntry>,
    block: BlockContext,
}

/// In-memory execution environment.
///
/// Every state change happens inside [`Chain::transact`]: the world state is
/// snapshotted when the outermost unit opens and restored if it fails, so a
/// failed unit leaves no trace (accounts, nonces and logs included).
pub struct Chain {
    config: ChainConfig,
    state: WorldState,
    depth: usize,
    work_used: u64,
}

impl Chain {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            config,
            state: WorldState {
                accounts: BTreeMap::new(),
                nonces: HashMap::new(),
                logs: Vec::new(),
                block: BlockContext::genesis(),
            },
            depth: 0,
            work_used: 0,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ChainConfig) {
        self.config = config;
    }

    pub fn block(&self) -> &BlockContext {
        &self.state.block
    }

    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    // ── Units of work ───────────────────────────────────────────────

    /// Run `f` as one atomic unit of work.
    ///
    /// The outermost call opens a new block and resets the work counter.
    /// Nested calls join the enclosing unit.
    pub fn transact<T, E>(&mut self, f: impl FnOnce(&mut Chain) -> Result<T, E>) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        if self.depth > 0 {
            return f(self);
        }

        let snapshot = self.state.clone();
        self.state.block = BlockContext {
            number: snapshot.block.number + 1,
            timestamp: Utc::now(),
        };
        self.work_used = 0;
        self.depth = 1;

        let result = f(self);
        self.depth = 0;

        if let Err(ref err) = result {
            warn!(
                block = self.state.block.number,
                work = self.work_used,
                error = %err,
                "Unit of work reverted"
            );
            self.state = snapshot;
        } else {
            debug!(
                block = self.state.block.number,
                work = self.work_used,
                "Unit of work committed"
            );
        }
        result
    }

    /// Submit a single call as its own transaction.
    pub fn send(&mut self, sender: Address, to: Address, call: Call) -> Result<CallOutput, ChainError> {
        self.transact(|chain| chain.call(sender, to, call))
    }

    /// Consume one unit of work. State changes are only accepted inside an
    /// open unit.
    pub(crate) fn charge(&mut self) -> Result<(), ChainError> {
        if self.depth == 0 {
            return Err(ChainError::NotInTransaction);
        }
        self.work_used += 1;
        match self.config.max_work_per_transaction {
            Some(limit) if self.work_used > limit => Err(ChainError::WorkLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    pub fn work_used(&self) -> u64 {
        self.work_used
    }

    // ── Accounts ────────────────────────────────────────────────────

    /// Instantiate `account` at the address derived from the deployer's
    /// current nonce.
    pub fn create(&mut self, deployer: Address, account: Account) -> Result<Address, ChainError> {
        self.charge()?;
        let nonce = self.state.nonces.entry(deployer).or_insert(0);
        let address = Address::derive(&deployer, *nonce);
        *nonce += 1;

        if self.state.accounts.contains_key(&address) {
            return Err(ChainError::AddressCollision(address));
        }
        debug!(
            deployer = %deployer,
            address = %address,
            kind = account.kind_name(),
            "Account created"
        );
        self.state.accounts.insert(address, account);
        Ok(address)
    }

    /// Deploy base implementation code for a proxy kind.
    pub fn deploy_implementation(
        &mut self,
        deployer: Address,
        kind: ComponentKind,
    ) -> Result<Address, ChainError> {
        self.create(deployer, Account::Implementation(kind))
    }

    /// Deploy a program with no behaviour inside the environment.
    pub fn deploy_external(
        &mut self,
        deployer: Address,
        label: impl Into<String>,
    ) -> Result<Address, ChainError> {
        self.create(
            deployer,
            Account::External {
                label: label.into(),
            },
        )
    }

    pub fn external_label(&self, address: Address) -> Option<&str> {
        match self.state.accounts.get(&address) {
            Some(Account::External { label }) => Some(label.as_str()),
            _ => None,
        }
    }

    pub fn account(&self, address: Address) -> Option<&Account> {
        self.state.accounts.get(&address)
    }

    pub(crate) fn account_mut(&mut self, address: Address) -> Option<&mut Account> {
        self.state.accounts.get_mut(&address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.state.accounts.iter()
    }

    pub fn exists(&self, address: Address) -> bool {
        self.state.accounts.contains_key(&address)
    }

    pub fn nonce(&self, address: Address) -> u64 {
        self.state.nonces.get(&address).copied().unwrap_or(0)
    }

    pub(crate) fn require_implementation(
        &self,
        address: Address,
        kind: ComponentKind,
    ) -> Result<(), ChainError> {
        match self.account(address) {
            Some(Account::Implementation(k)) if *k == kind => Ok(()),
            _ => Err(ChainError::InvalidImplementation {
                address,
                expected: kind,
            }),
        }
    }

    // ── Events ──────────────────────────────────────────────────────

    /// Append an event on behalf of `emitter`.
    pub fn emit(&mut self, emitter: Address, event: Event) -> Result<(), ChainError> {
        self.charge()?;
        self.log(emitter, event);
        Ok(())
    }

    pub(crate) fn log(&mut self, emitter: Address, event: Event) {
        self.state.logs.push(LogEntry {
            block: self.state.block.number,
            emitter,
            event,
        });
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.state.logs
    }

    pub fn events_from(&self, emitter: Address) -> impl Iterator<Item = &Event> {
        self.state
            .logs
            .iter()
            .filter(move |entry| entry.emitter == emitter)
            .map(|entry| &entry.event)
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}
