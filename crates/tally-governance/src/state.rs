//! Ledger tables and the propose/vote/finalize/cancel state machine.
//!
//! `LedgerState` takes the caller's weight as an argument; reading it from
//! an oracle is the job of the handles in `ledger` and `shared`. Every
//! operation validates everything it needs before its first write, so a
//! rejected call leaves every table untouched.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use tally_types::{Address, Amount};
use crate::config::{LedgerConfig, TerminalVotePolicy};
use crate::error::GovernanceError;
use crate::events::{EventListener, EventLog, EventRecord, LedgerEvent};
use crate::proposal::{Proposal, ProposalDraft, ProposalStatus, VoteRecord};
use crate::treasury::{Payout, Treasury};

/// Proposal table, vote registry, custody and event log.
pub struct LedgerState {
    pub(crate) config: LedgerConfig,
    pub(crate) proposals: BTreeMap<u64, Proposal>,
    pub(crate) votes: HashMap<(Address, u64), VoteRecord>,
    pub(crate) proposal_count: u64,
    pub(crate) treasury: Treasury,
    pub(crate) payout: Box<dyn Payout>,
    pub(crate) events: EventLog,
}

impl std::fmt::Debug for LedgerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerState")
            .field("config", &self.config)
            .field("proposal_count", &self.proposal_count)
            .field("treasury", &self.treasury)
            .field("events", &self.events)
            .finish()
    }
}

impl LedgerState {
    /// Create an empty ledger.
    pub fn new(config: LedgerConfig, payout: Box<dyn Payout>) -> Result<Self, GovernanceError> {
        config.validate()?;
        info!("Ledger created with quorum {} owned by {}", config.quorum, config.owner);

        Ok(Self {
            config,
            proposals: BTreeMap::new(),
            votes: HashMap::new(),
            proposal_count: 0,
            treasury: Treasury::new(),
            payout,
            events: EventLog::new(),
        })
    }

    fn authorize(caller: &Address, weight: Amount) -> Result<(), GovernanceError> {
        if weight.is_zero() {
            debug!("Rejected call from {}: no voting weight", caller);
            return Err(GovernanceError::Unauthorized(*caller));
        }
        Ok(())
    }

    fn existing(&self, id: u64) -> Result<&Proposal, GovernanceError> {
        self.proposals.get(&id).ok_or(GovernanceError::NotFound(id))
    }

    /// Accept funds into custody. No preconditions beyond balance overflow.
    pub fn deposit(&mut self, from: Address, amount: Amount) -> Result<Amount, GovernanceError> {
        let balance = self.treasury.deposit(amount)?;
        self.events.emit(LedgerEvent::Deposited { from, amount });
        debug!("Deposit of {} from {}, treasury now {}", amount, from, balance);
        Ok(balance)
    }

    /// Create a proposal. The id is allocated only after every check passes.
    pub fn propose(
        &mut self,
        caller: Address,
        weight: Amount,
        draft: ProposalDraft,
    ) -> Result<u64, GovernanceError> {
        Self::authorize(&caller, weight)?;
        draft.validate()?;
        self.treasury.ensure_covers(draft.amount)?;

        let id = self
            .proposal_count
            .checked_add(1)
            .ok_or(GovernanceError::Overflow("proposal id"))?;

        let proposal = Proposal::new(id, draft, caller);
        self.events.emit(LedgerEvent::Proposed {
            id,
            name: proposal.name.clone(),
            description: proposal.description.clone(),
            amount: proposal.amount,
            recipient: proposal.recipient,
            creator: caller,
        });
        info!(
            "Proposal #{} '{}' created by {}: {} to {}",
            id, proposal.name, caller, proposal.amount, proposal.recipient
        );

        self.proposals.insert(id, proposal);
        self.proposal_count = id;
        Ok(id)
    }

    /// Record a weighted for/against vote.
    pub fn vote(
        &mut self,
        caller: Address,
        weight: Amount,
        id: u64,
        in_favor: bool,
    ) -> Result<(), GovernanceError> {
        Self::authorize(&caller, weight)?;
        let proposal = self.existing(id)?;

        if self.vote_record(&caller, id).has_voted() {
            return Err(GovernanceError::AlreadyVoted { id, voter: caller });
        }
        if self.config.terminal_votes == TerminalVotePolicy::Reject {
            proposal.ensure_open()?;
        }

        // Tally on a copy so an overflow cannot leave a half-applied vote
        let mut updated = proposal.clone();
        updated.apply_vote(in_favor, weight)?;

        self.proposals.insert(id, updated);
        self.votes.insert((caller, id), VoteRecord::from_direction(in_favor));
        self.events.emit(LedgerEvent::Voted { id, voter: caller, in_favor, weight });
        debug!(
            "Vote on #{} by {}: {} with weight {}",
            id,
            caller,
            if in_favor { "for" } else { "against" },
            weight
        );
        Ok(())
    }

    /// Pay out a proposal whose net tally reached quorum.
    ///
    /// The payout is attempted last; if the recipient rejects it, nothing
    /// (flag, balance, event) is committed and the proposal stays open.
    pub fn finalize(&mut self, caller: Address, weight: Amount, id: u64) -> Result<(), GovernanceError> {
        Self::authorize(&caller, weight)?;
        let proposal = self.existing(id)?;
        proposal.ensure_open()?;

        let quorum = self.config.quorum;
        if !proposal.meets_finalize_quorum(quorum) {
            return Err(GovernanceError::QuorumNotReached {
                actual: proposal.net_votes,
                required: quorum,
            });
        }

        // Reserve the funds first so nothing after a successful payout can fail
        let (recipient, amount) = (proposal.recipient, proposal.amount);
        let balance = self.treasury.debit(amount)?;
        if let Err(reason) = self.payout.pay(&recipient, amount) {
            self.treasury.refund(amount);
            warn!("Payout for proposal #{} to {} failed: {}", id, recipient, reason);
            return Err(GovernanceError::TransferFailed(reason));
        }

        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.finalized = true;
        }
        self.events.emit(LedgerEvent::Finalized { id, recipient, amount });
        info!("Proposal #{} finalized by {}: paid {} to {}, treasury now {}", id, caller, amount, recipient, balance);
        Ok(())
    }

    /// Cancel a proposal whose negative weight reached quorum. Moves no funds.
    pub fn cancel(&mut self, caller: Address, weight: Amount, id: u64) -> Result<(), GovernanceError> {
        Self::authorize(&caller, weight)?;
        let proposal = self.existing(id)?;
        proposal.ensure_open()?;

        let quorum = self.config.quorum;
        if !proposal.meets_cancel_quorum(quorum) {
            return Err(GovernanceError::QuorumNotReached {
                actual: proposal.negative_as_signed(),
                required: quorum,
            });
        }

        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.cancelled = true;
        }
        self.events.emit(LedgerEvent::Cancelled { id });
        info!("Proposal #{} cancelled by {}", id, caller);
        Ok(())
    }

    /// Point lookup in the vote registry.
    pub fn vote_record(&self, voter: &Address, id: u64) -> VoteRecord {
        self.votes.get(&(*voter, id)).copied().unwrap_or(VoteRecord::NotVoted)
    }

    pub fn has_voted(&self, voter: &Address, id: u64) -> bool {
        self.vote_record(voter, id).has_voted()
    }

    pub fn has_voted_in_favor(&self, voter: &Address, id: u64) -> bool {
        self.vote_record(voter, id) == VoteRecord::VotedFor
    }

    pub fn has_voted_against(&self, voter: &Address, id: u64) -> bool {
        self.vote_record(voter, id) == VoteRecord::VotedAgainst
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn status(&self, id: u64) -> Result<ProposalStatus, GovernanceError> {
        self.existing(id).map(Proposal::status)
    }

    /// Highest id assigned so far.
    pub fn proposal_count(&self) -> u64 {
        self.proposal_count
    }

    pub fn treasury_balance(&self) -> Amount {
        self.treasury.balance()
    }

    pub fn quorum(&self) -> Amount {
        self.config.quorum
    }

    pub fn owner(&self) -> Address {
        self.config.owner
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.events.subscribe(listener);
    }
}
