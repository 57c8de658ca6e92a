//! Tally Governance - Treasury-governed proposal ledger.
//!
//! This crate provides:
//! - Proposal lifecycle (Open -> Finalized | Cancelled)
//! - Weighted for/against voting with a per-voter registry
//! - Funds custody and payout on finalize
//! - Append-only event log with replay
//! - Thread-safe and async handles over one serialized ledger

pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod proposal;
pub mod shared;
pub mod snapshot;
pub mod state;
pub mod treasury;

pub use config::{LedgerConfig, TerminalVotePolicy};
pub use error::GovernanceError;
pub use events::{replay, EventListener, EventLog, EventRecord, LedgerEvent, ReplayedLedger};
pub use ledger::GovernanceLedger;
pub use oracle::{AsyncWeightOracle, StaticWeights, WeightOracle};
pub use proposal::{Proposal, ProposalDraft, ProposalStatus, VoteRecord};
pub use shared::SharedLedger;
pub use snapshot::{LedgerSnapshot, VoteEntry};
pub use state::LedgerState;
pub use treasury::{AccountBook, Payout, Treasury};

pub use tally_types::{Address, Amount};
