//! Single-owner ledger handle bound to a synchronous weight oracle.

use tally_types::{Address, Amount};
use crate::config::LedgerConfig;
use crate::error::GovernanceError;
use crate::events::{EventListener, EventRecord};
use crate::oracle::WeightOracle;
use crate::proposal::{Proposal, ProposalDraft, ProposalStatus};
use crate::state::LedgerState;
use crate::treasury::Payout;

/// Governance ledger that reads caller weight from `O` on every call.
#[derive(Debug)]
pub struct GovernanceLedger<O> {
    state: LedgerState,
    oracle: O,
}

impl<O: WeightOracle> GovernanceLedger<O> {
    /// Create a new ledger.
    pub fn new(config: LedgerConfig, oracle: O, payout: Box<dyn Payout>) -> Result<Self, GovernanceError> {
        Ok(Self {
            state: LedgerState::new(config, payout)?,
            oracle,
        })
    }

    /// Wrap existing state, e.g. one restored from a snapshot.
    pub fn from_state(state: LedgerState, oracle: O) -> Self {
        Self { state, oracle }
    }

    fn weight_of(&self, caller: &Address) -> Amount {
        self.oracle.balance_of(caller)
    }

    /// Create a spending proposal.
    pub fn propose(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        amount: Amount,
        recipient: Address,
        caller: Address,
    ) -> Result<u64, GovernanceError> {
        let weight = self.weight_of(&caller);
        let draft = ProposalDraft::new(name, description, amount, recipient);
        self.state.propose(caller, weight, draft)
    }

    /// Vote for or against a proposal with the caller's current weight.
    pub fn vote(&mut self, id: u64, in_favor: bool, caller: Address) -> Result<(), GovernanceError> {
        let weight = self.weight_of(&caller);
        self.state.vote(caller, weight, id, in_favor)
    }

    /// Legacy always-in-favor vote.
    pub fn vote_in_favor(&mut self, id: u64, caller: Address) -> Result<(), GovernanceError> {
        self.vote(id, true, caller)
    }

    pub fn finalize(&mut self, id: u64, caller: Address) -> Result<(), GovernanceError> {
        let weight = self.weight_of(&caller);
        self.state.finalize(caller, weight, id)
    }

    pub fn cancel(&mut self, id: u64, caller: Address) -> Result<(), GovernanceError> {
        let weight = self.weight_of(&caller);
        self.state.cancel(caller, weight, id)
    }

    pub fn deposit(&mut self, from: Address, amount: Amount) -> Result<Amount, GovernanceError> {
        self.state.deposit(from, amount)
    }

    pub fn has_voted(&self, voter: &Address, id: u64) -> bool {
        self.state.has_voted(voter, id)
    }

    pub fn has_voted_in_favor(&self, voter: &Address, id: u64) -> bool {
        self.state.has_voted_in_favor(voter, id)
    }

    pub fn has_voted_against(&self, voter: &Address, id: u64) -> bool {
        self.state.has_voted_against(voter, id)
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.state.proposal(id)
    }

    pub fn status(&self, id: u64) -> Result<ProposalStatus, GovernanceError> {
        self.state.status(id)
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.proposal_count()
    }

    pub fn treasury_balance(&self) -> Amount {
        self.state.treasury_balance()
    }

    pub fn quorum(&self) -> Amount {
        self.state.quorum()
    }

    pub fn owner(&self) -> Address {
        self.state.owner()
    }

    pub fn events(&self) -> &[EventRecord] {
        self.state.events()
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.state.subscribe(listener);
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::StaticWeights;
    use crate::treasury::AccountBook;

    const OWNER: Address = Address::from_bytes([1u8; 20]);
    const HOLDER: Address = Address::from_bytes([2u8; 20]);
    const RECIPIENT: Address = Address::from_bytes([9u8; 20]);

    #[test]
    fn test_weight_read_at_call_time() {
        let weights = StaticWeights::new().with(HOLDER, Amount::from(60u64));
        let mut ledger = GovernanceLedger::new(
            LedgerConfig::new(Amount::from(100u64), OWNER),
            weights.clone(),
            Box::new(AccountBook::new()),
        )
        .unwrap();
        ledger.deposit(OWNER, Amount::from(20u64)).unwrap();

        let first = ledger.propose("A", "first", Amount::from(5u64), RECIPIENT, HOLDER).unwrap();
        let second = ledger.propose("B", "second", Amount::from(5u64), RECIPIENT, HOLDER).unwrap();

        ledger.vote(first, true, HOLDER).unwrap();
        weights.set(HOLDER, Amount::from(90u64));
        ledger.vote(second, true, HOLDER).unwrap();

        assert_eq!(ledger.proposal(first).unwrap().net_votes, 60);
        assert_eq!(ledger.proposal(second).unwrap().net_votes, 90);
    }

    #[test]
    fn test_legacy_vote_adapter() {
        let weights = StaticWeights::new().with(HOLDER, Amount::from(10u64));
        let mut ledger = GovernanceLedger::new(LedgerConfig::default(), weights, Box::new(AccountBook::new())).unwrap();
        ledger.deposit(OWNER, Amount::from(5u64)).unwrap();
        let id = ledger.propose("A", "adapter", Amount::from(5u64), RECIPIENT, HOLDER).unwrap();

        ledger.vote_in_favor(id, HOLDER).unwrap();
        assert!(ledger.has_voted_in_favor(&HOLDER, id));
        assert_eq!(ledger.proposal(id).unwrap().positive_weight, Amount::from(10u64));
        assert_eq!(ledger.vote_in_favor(id, HOLDER), Err(GovernanceError::AlreadyVoted { id, voter: HOLDER }));
    }

    #[test]
    fn test_holder_who_sold_out_is_unauthorized() {
        let weights = StaticWeights::new().with(HOLDER, Amount::from(10u64));
        let mut ledger = GovernanceLedger::new(LedgerConfig::default(), weights.clone(), Box::new(AccountBook::new())).unwrap();
        ledger.deposit(OWNER, Amount::from(5u64)).unwrap();
        let id = ledger.propose("A", "sold", Amount::from(5u64), RECIPIENT, HOLDER).unwrap();

        weights.set(HOLDER, Amount::ZERO);
        assert_eq!(ledger.vote(id, true, HOLDER), Err(GovernanceError::Unauthorized(HOLDER)));
        assert!(!ledger.has_voted(&HOLDER, id));
    }
}
