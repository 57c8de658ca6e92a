//! Thread-safe ledger handle for concurrent callers.
//!
//! Weight is awaited from the oracle before the lock is taken; every
//! precondition and mutation then runs under one mutex, so the committed
//! history is a serial order of all submitted operations. The lock is never
//! held across an await point.

use std::sync::Arc;
use parking_lot::Mutex;
use tally_types::{Address, Amount};
use crate::error::GovernanceError;
use crate::events::EventRecord;
use crate::oracle::AsyncWeightOracle;
use crate::proposal::{Proposal, ProposalDraft, ProposalStatus};
use crate::snapshot::LedgerSnapshot;
use crate::state::LedgerState;

/// Cloneable handle over one serialized `LedgerState`.
pub struct SharedLedger<O> {
    state: Arc<Mutex<LedgerState>>,
    oracle: Arc<O>,
}

impl<O> Clone for SharedLedger<O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            oracle: Arc::clone(&self.oracle),
        }
    }
}

impl<O: AsyncWeightOracle> SharedLedger<O> {
    pub fn new(state: LedgerState, oracle: O) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            oracle: Arc::new(oracle),
        }
    }

    pub async fn propose(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        amount: Amount,
        recipient: Address,
        caller: Address,
    ) -> Result<u64, GovernanceError> {
        let draft = ProposalDraft::new(name, description, amount, recipient);
        let weight = self.oracle.balance_of(&caller).await;
        self.state.lock().propose(caller, weight, draft)
    }

    pub async fn vote(&self, id: u64, in_favor: bool, caller: Address) -> Result<(), GovernanceError> {
        let weight = self.oracle.balance_of(&caller).await;
        self.state.lock().vote(caller, weight, id, in_favor)
    }

    /// Legacy always-in-favor vote.
    pub async fn vote_in_favor(&self, id: u64, caller: Address) -> Result<(), GovernanceError> {
        self.vote(id, true, caller).await
    }

    pub async fn finalize(&self, id: u64, caller: Address) -> Result<(), GovernanceError> {
        let weight = self.oracle.balance_of(&caller).await;
        self.state.lock().finalize(caller, weight, id)
    }

    pub async fn cancel(&self, id: u64, caller: Address) -> Result<(), GovernanceError> {
        let weight = self.oracle.balance_of(&caller).await;
        self.state.lock().cancel(caller, weight, id)
    }

    pub fn deposit(&self, from: Address, amount: Amount) -> Result<Amount, GovernanceError> {
        self.state.lock().deposit(from, amount)
    }

    pub fn has_voted(&self, voter: &Address, id: u64) -> bool {
        self.state.lock().has_voted(voter, id)
    }

    pub fn has_voted_in_favor(&self, voter: &Address, id: u64) -> bool {
        self.state.lock().has_voted_in_favor(voter, id)
    }

    pub fn has_voted_against(&self, voter: &Address, id: u64) -> bool {
        self.state.lock().has_voted_against(voter, id)
    }

    /// Copy of the proposal as of now.
    pub fn proposal(&self, id: u64) -> Option<Proposal> {
        self.state.lock().proposal(id).cloned()
    }

    pub fn status(&self, id: u64) -> Result<ProposalStatus, GovernanceError> {
        self.state.lock().status(id)
    }

    pub fn treasury_balance(&self) -> Amount {
        self.state.lock().treasury_balance()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.state.lock().events().to_vec()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().snapshot()
    }
}
