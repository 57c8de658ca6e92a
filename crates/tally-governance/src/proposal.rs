//! Proposal lifecycle management.
//!
//! Proposals go through states: Open -> Finalized | Cancelled.
//! Both end states are terminal and mutually exclusive.

use serde::{Deserialize, Serialize};
use tally_types::{Address, Amount};
use crate::error::GovernanceError;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Accepting votes, may be finalized or cancelled
    Open,
    /// Funds were paid out
    Finalized,
    /// Rejected by negative weight, no funds moved
    Cancelled,
}

impl ProposalStatus {
    /// Check if no further vote/finalize/cancel can succeed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Open)
    }
}

/// A voter's stance on one proposal. Absence from the registry means
/// not-voted; once recorded a stance never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteRecord {
    NotVoted,
    VotedFor,
    VotedAgainst,
}

impl VoteRecord {
    pub fn from_direction(in_favor: bool) -> Self {
        if in_favor {
            VoteRecord::VotedFor
        } else {
            VoteRecord::VotedAgainst
        }
    }

    pub fn has_voted(&self) -> bool {
        !matches!(self, VoteRecord::NotVoted)
    }
}

/// Caller-supplied fields of a new proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub name: String,
    pub description: String,
    pub amount: Amount,
    pub recipient: Address,
}

impl ProposalDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        amount: Amount,
        recipient: Address,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            amount,
            recipient,
        }
    }

    /// Input validation done at propose time, before any funds check.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.amount.is_zero() {
            return Err(GovernanceError::InvalidAmount);
        }
        if self.recipient.is_zero() {
            return Err(GovernanceError::InvalidRecipient);
        }
        if self.name.trim().is_empty() {
            return Err(GovernanceError::InvalidMetadata("name is empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(GovernanceError::InvalidMetadata("description is empty".to_string()));
        }
        Ok(())
    }
}

/// Treasury spending proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique proposal ID, never reused
    pub id: u64,
    pub name: String,
    pub description: String,
    /// Amount paid to `recipient` on finalize
    pub amount: Amount,
    pub recipient: Address,
    /// Proposer address
    pub creator: Address,
    /// positive_weight - negative_weight
    pub net_votes: i128,
    pub positive_weight: Amount,
    pub negative_weight: Amount,
    pub finalized: bool,
    pub cancelled: bool,
}

impl Proposal {
    /// Create an open proposal with zeroed tallies.
    pub fn new(id: u64, draft: ProposalDraft, creator: Address) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            amount: draft.amount,
            recipient: draft.recipient,
            creator,
            net_votes: 0,
            positive_weight: Amount::ZERO,
            negative_weight: Amount::ZERO,
            finalized: false,
            cancelled: false,
        }
    }

    pub fn status(&self) -> ProposalStatus {
        if self.finalized {
            ProposalStatus::Finalized
        } else if self.cancelled {
            ProposalStatus::Cancelled
        } else {
            ProposalStatus::Open
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Fails with the error matching whichever terminal flag is set.
    pub fn ensure_open(&self) -> Result<(), GovernanceError> {
        if self.finalized {
            return Err(GovernanceError::AlreadyFinalized(self.id));
        }
        if self.cancelled {
            return Err(GovernanceError::AlreadyCancelled(self.id));
        }
        Ok(())
    }

    /// Add `weight` to one side of the tally.
    ///
    /// All three counters are computed first and written together, so an
    /// overflow leaves the proposal untouched.
    pub fn apply_vote(&mut self, in_favor: bool, weight: Amount) -> Result<(), GovernanceError> {
        let signed = weight.to_signed().map_err(|_| GovernanceError::Overflow("vote weight"))?;

        if in_favor {
            let positive = self
                .positive_weight
                .checked_add(weight)
                .ok_or(GovernanceError::Overflow("positive weight"))?;
            let net = self
                .net_votes
                .checked_add(signed)
                .ok_or(GovernanceError::Overflow("net votes"))?;
            self.positive_weight = positive;
            self.net_votes = net;
        } else {
            let negative = self
                .negative_weight
                .checked_add(weight)
                .ok_or(GovernanceError::Overflow("negative weight"))?;
            let net = self
                .net_votes
                .checked_sub(signed)
                .ok_or(GovernanceError::Overflow("net votes"))?;
            self.negative_weight = negative;
            self.net_votes = net;
        }

        Ok(())
    }

    /// Signed net tally compared against the quorum.
    pub fn meets_finalize_quorum(&self, quorum: Amount) -> bool {
        match quorum.to_signed() {
            Ok(q) => self.net_votes >= q,
            // No reachable net tally exceeds i128::MAX
            Err(_) => false,
        }
    }

    /// Unsigned negative tally compared against the quorum.
    pub fn meets_cancel_quorum(&self, quorum: Amount) -> bool {
        self.negative_weight >= quorum
    }

    /// Negative weight projected into the signed domain for error reporting.
    pub(crate) fn negative_as_signed(&self) -> i128 {
        self.negative_weight.to_signed().unwrap_or(i128::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProposalDraft {
        ProposalDraft::new(
            "Audit grant",
            "Fund the external audit",
            Amount::from(10u64),
            Address::from_bytes([9u8; 20]),
        )
    }

    #[test]
    fn test_proposal_creation() {
        let proposal = Proposal::new(1, draft(), Address::from_bytes([1u8; 20]));

        assert_eq!(proposal.id, 1);
        assert_eq!(proposal.status(), ProposalStatus::Open);
        assert_eq!(proposal.net_votes, 0);
        assert!(proposal.positive_weight.is_zero());
        assert!(proposal.negative_weight.is_zero());
        assert!(proposal.ensure_open().is_ok());
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut d = draft();
        d.amount = Amount::ZERO;
        assert_eq!(d.validate(), Err(GovernanceError::InvalidAmount));

        let mut d = draft();
        d.recipient = Address::ZERO;
        assert_eq!(d.validate(), Err(GovernanceError::InvalidRecipient));

        let mut d = draft();
        d.name = "   ".to_string();
        assert!(matches!(d.validate(), Err(GovernanceError::InvalidMetadata(_))));

        let mut d = draft();
        d.description = String::new();
        assert!(matches!(d.validate(), Err(GovernanceError::InvalidMetadata(_))));
    }

    #[test]
    fn test_apply_vote_tallies() {
        let mut proposal = Proposal::new(1, draft(), Address::ZERO);

        proposal.apply_vote(true, Amount::from(60u64)).unwrap();
        proposal.apply_vote(false, Amount::from(70u64)).unwrap();

        assert_eq!(proposal.positive_weight, Amount::from(60u64));
        assert_eq!(proposal.negative_weight, Amount::from(70u64));
        assert_eq!(proposal.net_votes, -10);
        assert!(!proposal.meets_finalize_quorum(Amount::from(100u64)));
        assert!(!proposal.meets_cancel_quorum(Amount::from(100u64)));
        assert!(proposal.meets_cancel_quorum(Amount::from(70u64)));
    }

    #[test]
    fn test_apply_vote_overflow_leaves_tally() {
        let mut proposal = Proposal::new(1, draft(), Address::ZERO);
        proposal.apply_vote(true, Amount::new(i128::MAX as u128)).unwrap();

        let before = proposal.clone();
        let err = proposal.apply_vote(true, Amount::from(1u64)).unwrap_err();
        assert!(matches!(err, GovernanceError::Overflow(_)));
        assert_eq!(proposal, before);

        // Weight too large for the signed domain
        let err = proposal.apply_vote(false, Amount::MAX).unwrap_err();
        assert!(matches!(err, GovernanceError::Overflow(_)));
        assert_eq!(proposal, before);
    }

    #[test]
    fn test_terminal_flags() {
        let mut proposal = Proposal::new(4, draft(), Address::ZERO);
        proposal.finalized = true;
        assert_eq!(proposal.status(), ProposalStatus::Finalized);
        assert_eq!(proposal.ensure_open(), Err(GovernanceError::AlreadyFinalized(4)));

        let mut proposal = Proposal::new(5, draft(), Address::ZERO);
        proposal.cancelled = true;
        assert!(proposal.is_terminal());
        assert_eq!(proposal.ensure_open(), Err(GovernanceError::AlreadyCancelled(5)));
    }

    #[test]
    fn test_vote_record() {
        assert_eq!(VoteRecord::from_direction(true), VoteRecord::VotedFor);
        assert_eq!(VoteRecord::from_direction(false), VoteRecord::VotedAgainst);
        assert!(!VoteRecord::NotVoted.has_voted());
        assert!(VoteRecord::VotedAgainst.has_voted());
    }
}
