//! Ledger event stream.
//!
//! Every committed state transition appends one event, in commit order.
//! The log is the only enumerable view of who voted how; replaying it
//! rebuilds the proposal table, vote registry and custody balance.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Deserialize, Serialize};
use tally_types::{Address, Amount};
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalDraft, VoteRecord};

/// Committed state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    Proposed {
        id: u64,
        name: String,
        description: String,
        amount: Amount,
        recipient: Address,
        creator: Address,
    },
    Voted {
        id: u64,
        voter: Address,
        in_favor: bool,
        /// Weight observed at the time of the vote
        weight: Amount,
    },
    Finalized {
        id: u64,
        recipient: Address,
        amount: Amount,
    },
    Cancelled {
        id: u64,
    },
    Deposited {
        from: Address,
        amount: Amount,
    },
}

/// Event with its position in the log (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Observer notified synchronously after each commit.
pub trait EventListener: Send {
    fn on_event(&mut self, record: &EventRecord);
}

impl<F> EventListener for F
where
    F: FnMut(&EventRecord) + Send,
{
    fn on_event(&mut self, record: &EventRecord) {
        self(record)
    }
}

/// Append-only event log.
#[derive(Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    listeners: Vec<Box<dyn EventListener>>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("records", &self.records.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted records. Sequence numbers must be 1..=n.
    pub fn from_records(records: Vec<EventRecord>) -> Result<Self, GovernanceError> {
        for (i, record) in records.iter().enumerate() {
            if record.seq != i as u64 + 1 {
                return Err(GovernanceError::CorruptEventLog(format!(
                    "expected seq {}, found {}",
                    i + 1,
                    record.seq
                )));
            }
        }
        Ok(Self { records, listeners: Vec::new() })
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) -> u64 {
        let seq = self.records.len() as u64 + 1;
        let record = EventRecord { seq, event };
        for listener in self.listeners.iter_mut() {
            listener.on_event(&record);
        }
        self.records.push(record);
        seq
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `seq > after`.
    pub fn since(&self, after: u64) -> &[EventRecord] {
        let start = (after as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ledger state reconstructed purely from events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayedLedger {
    pub proposals: BTreeMap<u64, Proposal>,
    pub votes: HashMap<(Address, u64), VoteRecord>,
    pub proposal_count: u64,
    pub treasury_balance: Amount,
}

impl ReplayedLedger {
    pub fn vote_record(&self, voter: &Address, id: u64) -> VoteRecord {
        self.votes.get(&(*voter, id)).copied().unwrap_or(VoteRecord::NotVoted)
    }

    fn proposal_mut(&mut self, id: u64) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(&id)
            .ok_or_else(|| GovernanceError::CorruptEventLog(format!("event for unknown proposal {}", id)))
    }

    fn apply(&mut self, event: &LedgerEvent) -> Result<(), GovernanceError> {
        match event {
            LedgerEvent::Proposed { id, name, description, amount, recipient, creator } => {
                if *id != self.proposal_count + 1 {
                    return Err(GovernanceError::CorruptEventLog(format!(
                        "proposal id {} out of order after {}",
                        id, self.proposal_count
                    )));
                }
                let draft = ProposalDraft::new(name.clone(), description.clone(), *amount, *recipient);
                self.proposals.insert(*id, Proposal::new(*id, draft, *creator));
                self.proposal_count = *id;
            }
            LedgerEvent::Voted { id, voter, in_favor, weight } => {
                if self.vote_record(voter, *id).has_voted() {
                    return Err(GovernanceError::CorruptEventLog(format!(
                        "second vote by {} on proposal {}",
                        voter, id
                    )));
                }
                self.proposal_mut(*id)?.apply_vote(*in_favor, *weight)?;
                self.votes.insert((*voter, *id), VoteRecord::from_direction(*in_favor));
            }
            LedgerEvent::Finalized { id, amount, .. } => {
                let proposal = self.proposal_mut(*id)?;
                proposal.ensure_open()?;
                proposal.finalized = true;
                self.treasury_balance = self.treasury_balance.checked_sub(*amount).ok_or_else(|| {
                    GovernanceError::CorruptEventLog(format!("proposal {} paid out more than custody", id))
                })?;
            }
            LedgerEvent::Cancelled { id } => {
                let proposal = self.proposal_mut(*id)?;
                proposal.ensure_open()?;
                proposal.cancelled = true;
            }
            LedgerEvent::Deposited { amount, .. } => {
                self.treasury_balance = self
                    .treasury_balance
                    .checked_add(*amount)
                    .ok_or(GovernanceError::Overflow("treasury balance"))?;
            }
        }
        Ok(())
    }
}

/// Rebuild ledger state from a full event history.
pub fn replay(records: &[EventRecord]) -> Result<ReplayedLedger, GovernanceError> {
    let mut ledger = ReplayedLedger::default();
    for record in records {
        ledger.apply(&record.event).map_err(|e| match e {
            GovernanceError::CorruptEventLog(_) => e,
            other => GovernanceError::CorruptEventLog(format!("seq {}: {}", record.seq, other)),
        })?;
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn proposed(id: u64) -> LedgerEvent {
        LedgerEvent::Proposed {
            id,
            name: "Grant".to_string(),
            description: "Pay the grantee".to_string(),
            amount: Amount::from(10u64),
            recipient: addr(9),
            creator: addr(1),
        }
    }

    fn log_of(events: Vec<LedgerEvent>) -> EventLog {
        let mut log = EventLog::new();
        for event in events {
            log.emit(event);
        }
        log
    }

    #[test]
    fn test_emit_assigns_sequence() {
        let log = log_of(vec![
            LedgerEvent::Deposited { from: addr(1), amount: Amount::from(10u64) },
            proposed(1),
        ]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].seq, 1);
        assert_eq!(log.records()[1].seq, 2);
        assert_eq!(log.since(1).len(), 1);
        assert!(log.since(5).is_empty());
    }

    #[test]
    fn test_listeners_see_commit_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut log = EventLog::new();
        log.subscribe(Box::new(move |r: &EventRecord| sink.lock().unwrap().push(r.seq)));

        log.emit(proposed(1));
        log.emit(LedgerEvent::Cancelled { id: 1 });
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_replay_rebuilds_state() {
        let log = log_of(vec![
            LedgerEvent::Deposited { from: addr(1), amount: Amount::from(10u64) },
            proposed(1),
            LedgerEvent::Voted { id: 1, voter: addr(2), in_favor: true, weight: Amount::from(60u64) },
            LedgerEvent::Voted { id: 1, voter: addr(3), in_favor: true, weight: Amount::from(50u64) },
            LedgerEvent::Finalized { id: 1, recipient: addr(9), amount: Amount::from(10u64) },
        ]);

        let replayed = replay(log.records()).unwrap();
        let proposal = &replayed.proposals[&1];
        assert_eq!(proposal.net_votes, 110);
        assert!(proposal.finalized);
        assert_eq!(replayed.treasury_balance, Amount::ZERO);
        assert_eq!(replayed.vote_record(&addr(2), 1), VoteRecord::VotedFor);
        assert_eq!(replayed.vote_record(&addr(4), 1), VoteRecord::NotVoted);
    }

    #[test]
    fn test_replay_rejects_inconsistent_stream() {
        let double_vote = log_of(vec![
            proposed(1),
            LedgerEvent::Voted { id: 1, voter: addr(2), in_favor: true, weight: Amount::from(1u64) },
            LedgerEvent::Voted { id: 1, voter: addr(2), in_favor: false, weight: Amount::from(1u64) },
        ]);
        assert!(matches!(replay(double_vote.records()), Err(GovernanceError::CorruptEventLog(_))));

        let finalize_and_cancel = log_of(vec![
            LedgerEvent::Deposited { from: addr(1), amount: Amount::from(10u64) },
            proposed(1),
            LedgerEvent::Finalized { id: 1, recipient: addr(9), amount: Amount::from(10u64) },
            LedgerEvent::Cancelled { id: 1 },
        ]);
        assert!(matches!(replay(finalize_and_cancel.records()), Err(GovernanceError::CorruptEventLog(_))));

        let skipped_id = log_of(vec![proposed(2)]);
        assert!(replay(skipped_id.records()).is_err());
    }

    #[test]
    fn test_from_records_checks_sequence() {
        let records = vec![EventRecord { seq: 2, event: LedgerEvent::Cancelled { id: 1 } }];
        assert!(EventLog::from_records(records).is_err());
    }

    #[test]
    fn test_event_json_shape() {
        let record = EventRecord { seq: 3, event: LedgerEvent::Cancelled { id: 7 } };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "cancelled");
        assert_eq!(json["seq"], 3);
        assert_eq!(json["id"], 7);

        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
