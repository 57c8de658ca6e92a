//! Ledger persistence.
//!
//! A snapshot holds every table plus the full event log as JSON. The payout
//! target is not part of the snapshot and is supplied again on restore.
//! The event log is authoritative: tables that disagree with what the log
//! replays to are rejected.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use serde::{Deserialize, Serialize};
use tally_types::{Address, Amount};
use crate::config::LedgerConfig;
use crate::error::GovernanceError;
use crate::events::{replay, EventLog, EventRecord};
use crate::proposal::{Proposal, VoteRecord};
use crate::state::LedgerState;
use crate::treasury::{Payout, Treasury};

/// One entry of the vote registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub voter: Address,
    pub proposal_id: u64,
    pub record: VoteRecord,
}

/// Serializable copy of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub config: LedgerConfig,
    pub proposal_count: u64,
    pub proposals: Vec<Proposal>,
    pub votes: Vec<VoteEntry>,
    pub treasury_balance: Amount,
    pub events: Vec<EventRecord>,
}

impl LedgerSnapshot {
    /// Save snapshot to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<(), GovernanceError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::debug!("Snapshot with {} events written to {:?}", self.events.len(), path);
        Ok(())
    }

    /// Load snapshot from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, GovernanceError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Differences between the saved tables and what `events` replays to.
    ///
    /// Fails only if the event log itself cannot be replayed.
    pub fn mismatches(&self) -> Result<Vec<String>, GovernanceError> {
        let replayed = replay(&self.events)?;
        let mut mismatches = Vec::new();

        if replayed.proposal_count != self.proposal_count {
            mismatches.push(format!(
                "proposal count: events {}, saved {}",
                replayed.proposal_count, self.proposal_count
            ));
        }
        if replayed.treasury_balance != self.treasury_balance {
            mismatches.push(format!(
                "treasury: events {}, saved {}",
                replayed.treasury_balance, self.treasury_balance
            ));
        }

        let saved: BTreeMap<u64, &Proposal> = self.proposals.iter().map(|p| (p.id, p)).collect();
        if saved.len() != self.proposals.len() {
            mismatches.push("duplicate proposal ids in saved table".to_string());
        }
        let ids: BTreeSet<u64> = saved.keys().chain(replayed.proposals.keys()).copied().collect();
        for id in ids {
            match (replayed.proposals.get(&id), saved.get(&id)) {
                (Some(from_events), Some(stored)) if from_events == *stored => {}
                (Some(_), Some(_)) => mismatches.push(format!("proposal #{} differs", id)),
                (Some(_), None) => mismatches.push(format!("proposal #{} missing from saved table", id)),
                (None, Some(_)) => mismatches.push(format!("proposal #{} has no events", id)),
                (None, None) => {}
            }
        }

        let saved_votes: HashMap<(Address, u64), VoteRecord> = self
            .votes
            .iter()
            .map(|v| ((v.voter, v.proposal_id), v.record))
            .collect();
        if saved_votes.len() != self.votes.len() {
            mismatches.push("duplicate vote entries in saved table".to_string());
        }
        let mut keys: Vec<(Address, u64)> = saved_votes.keys().chain(replayed.votes.keys()).copied().collect();
        keys.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        keys.dedup();
        for (voter, id) in keys {
            let stored = saved_votes.get(&(voter, id)).copied().unwrap_or(VoteRecord::NotVoted);
            if replayed.vote_record(&voter, id) != stored {
                mismatches.push(format!("vote by {} on #{} differs", voter, id));
            }
        }

        Ok(mismatches)
    }
}

impl LedgerState {
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut votes: Vec<VoteEntry> = self
            .votes
            .iter()
            .map(|((voter, proposal_id), record)| VoteEntry {
                voter: *voter,
                proposal_id: *proposal_id,
                record: *record,
            })
            .collect();
        votes.sort_by(|a, b| (a.proposal_id, a.voter).cmp(&(b.proposal_id, b.voter)));

        LedgerSnapshot {
            config: self.config.clone(),
            proposal_count: self.proposal_count,
            proposals: self.proposals.values().cloned().collect(),
            votes,
            treasury_balance: self.treasury.balance(),
            events: self.events.records().to_vec(),
        }
    }

    /// Rebuild a ledger from a snapshot. Id allocation continues after
    /// `proposal_count`.
    ///
    /// Fails with `CorruptEventLog` unless every table matches its replayed
    /// event log.
    pub fn restore(snapshot: LedgerSnapshot, payout: Box<dyn Payout>) -> Result<Self, GovernanceError> {
        snapshot.config.validate()?;

        let mismatches = snapshot.mismatches()?;
        if !mismatches.is_empty() {
            tracing::warn!("Refusing snapshot with {} mismatches", mismatches.len());
            return Err(GovernanceError::CorruptEventLog(format!(
                "saved tables disagree with events: {}",
                mismatches.join("; ")
            )));
        }

        let proposals = snapshot.proposals.into_iter().map(|p| (p.id, p)).collect();
        let votes = snapshot
            .votes
            .into_iter()
            .filter(|entry| entry.record.has_voted())
            .map(|entry| ((entry.voter, entry.proposal_id), entry.record))
            .collect();

        let state = Self {
            config: snapshot.config,
            proposals,
            votes,
            proposal_count: snapshot.proposal_count,
            treasury: Treasury::with_balance(snapshot.treasury_balance),
            payout,
            events: EventLog::from_records(snapshot.events)?,
        };
        tracing::info!(
            "Ledger restored: {} proposals, treasury {}",
            state.proposal_count,
            state.treasury.balance()
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::ProposalDraft;
    use crate::treasury::AccountBook;
    use tempfile::TempDir;

    const OWNER: Address = Address::from_bytes([1u8; 20]);
    const VOTER: Address = Address::from_bytes([2u8; 20]);
    const RECIPIENT: Address = Address::from_bytes([9u8; 20]);

    fn populated() -> LedgerState {
        let mut state =
            LedgerState::new(LedgerConfig::new(Amount::from(50u64), OWNER), Box::new(AccountBook::new())).unwrap();
        state.deposit(OWNER, Amount::from(30u64)).unwrap();
        let draft = ProposalDraft::new("Grant", "Snapshot me", Amount::from(10u64), RECIPIENT);
        let id = state.propose(OWNER, Amount::from(1u64), draft.clone()).unwrap();
        state.vote(VOTER, Amount::from(70u64), id, true).unwrap();
        state.finalize(VOTER, Amount::from(70u64), id).unwrap();
        state.propose(OWNER, Amount::from(1u64), draft).unwrap();
        state
    }

    fn restore(snapshot: LedgerSnapshot) -> Result<LedgerState, GovernanceError> {
        LedgerState::restore(snapshot, Box::new(AccountBook::new()))
    }

    #[test]
    fn test_snapshot_file_restore() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let original = populated();
        original.snapshot().save_json(&path).unwrap();

        let loaded = LedgerSnapshot::load_json(&path).unwrap();
        assert_eq!(loaded, original.snapshot());
        assert!(loaded.mismatches().unwrap().is_empty());

        let mut restored = restore(loaded).unwrap();
        assert_eq!(restored.proposal_count(), 2);
        assert_eq!(restored.treasury_balance(), Amount::from(20u64));
        assert!(restored.has_voted_in_favor(&VOTER, 1));
        assert!(restored.proposal(1).unwrap().finalized);
        assert_eq!(restored.events().len(), original.events().len());

        let draft = ProposalDraft::new("Next", "After restore", Amount::from(1u64), RECIPIENT);
        assert_eq!(restored.propose(OWNER, Amount::from(1u64), draft).unwrap(), 3);
        assert_eq!(restored.events().last().unwrap().seq, original.events().len() as u64 + 1);
    }

    #[test]
    fn test_restore_rejects_tables_that_disagree_with_events() {
        let mut snapshot = populated().snapshot();
        snapshot.proposal_count = 1;
        assert!(matches!(restore(snapshot), Err(GovernanceError::CorruptEventLog(_))));

        let mut snapshot = populated().snapshot();
        snapshot.proposals[0].cancelled = true;
        assert!(matches!(restore(snapshot), Err(GovernanceError::CorruptEventLog(_))));

        // Tally inflated on an unvoted proposal
        let mut snapshot = populated().snapshot();
        snapshot.proposals[1].net_votes = 1_000;
        assert!(matches!(restore(snapshot), Err(GovernanceError::CorruptEventLog(_))));

        let mut snapshot = populated().snapshot();
        snapshot.proposals.remove(1);
        assert_eq!(snapshot.mismatches().unwrap(), vec!["proposal #2 missing from saved table".to_string()]);
        assert!(restore(snapshot).is_err());

        let mut snapshot = populated().snapshot();
        snapshot.treasury_balance = Amount::from(1_000_000u64);
        assert!(matches!(restore(snapshot), Err(GovernanceError::CorruptEventLog(_))));

        let mut snapshot = populated().snapshot();
        snapshot.votes.clear();
        assert!(matches!(restore(snapshot), Err(GovernanceError::CorruptEventLog(_))));
    }

    #[test]
    fn test_restore_rejects_unreplayable_log() {
        let mut snapshot = populated().snapshot();
        snapshot.events.remove(0);
        assert!(matches!(restore(snapshot), Err(GovernanceError::CorruptEventLog(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LedgerSnapshot::load_json(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, GovernanceError::Storage(_)));
    }
}
