use tally_types::{Address, Amount};
use thiserror::Error;

/// Errors that can occur in governance operations.
///
/// Every variant is a rejection of a single operation; the ledger is left
/// exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Unauthorized: {0} holds no voting weight")]
    Unauthorized(Address),

    #[error("Invalid amount: proposals must request a positive amount")]
    InvalidAmount,

    #[error("Invalid recipient: the null address cannot receive funds")]
    InvalidRecipient,

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Proposal not found: {0}")]
    NotFound(u64),

    #[error("Already voted on proposal {id}: {voter}")]
    AlreadyVoted { id: u64, voter: Address },

    #[error("Proposal {0} already finalized")]
    AlreadyFinalized(u64),

    #[error("Proposal {0} already cancelled")]
    AlreadyCancelled(u64),

    #[error("Quorum not reached: {actual} < {required}")]
    QuorumNotReached { actual: i128, required: Amount },

    #[error("Insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: Amount, required: Amount },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corrupt event log: {0}")]
    CorruptEventLog(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for GovernanceError {
    fn from(e: std::io::Error) -> Self {
        GovernanceError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for GovernanceError {
    fn from(e: serde_json::Error) -> Self {
        GovernanceError::Storage(e.to_string())
    }
}
