//! Construction-time ledger configuration.

use serde::{Deserialize, Serialize};
use tally_types::{Address, Amount};
use crate::error::GovernanceError;

/// What `vote` does on a finalized or cancelled proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalVotePolicy {
    /// Reject with `AlreadyFinalized` / `AlreadyCancelled`
    #[default]
    Reject,
    /// Record the vote anyway (legacy behaviour)
    Allow,
}

/// Ledger configuration. Fixed for the lifetime of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Net-vote threshold for finalize, negative-weight threshold for cancel
    pub quorum: Amount,
    /// Deployer identity, recorded only
    pub owner: Address,
    #[serde(default)]
    pub terminal_votes: TerminalVotePolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            quorum: Amount::from(100u64),
            owner: Address::ZERO,
            terminal_votes: TerminalVotePolicy::Reject,
        }
    }
}

impl LedgerConfig {
    pub fn new(quorum: Amount, owner: Address) -> Self {
        Self {
            quorum,
            owner,
            ..Default::default()
        }
    }

    pub fn with_terminal_votes(mut self, policy: TerminalVotePolicy) -> Self {
        self.terminal_votes = policy;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        // A zero quorum would let an unvoted proposal be finalized or cancelled
        if self.quorum.is_zero() {
            return Err(GovernanceError::InvalidConfig("quorum must be positive".to_string()));
        }
        // Finalize compares against the signed net tally
        if self.quorum.to_signed().is_err() {
            return Err(GovernanceError::InvalidConfig(format!(
                "quorum {} exceeds the net vote range",
                self.quorum
            )));
        }
        if self.owner.is_zero() {
            tracing::warn!("Ledger owner is the null address");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.quorum, Amount::from(100u64));
        assert_eq!(config.terminal_votes, TerminalVotePolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = LedgerConfig::new(Amount::ZERO, Address::ZERO);
        assert!(matches!(config.validate(), Err(GovernanceError::InvalidConfig(_))));

        let config = LedgerConfig::new(Amount::MAX, Address::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_terminal_votes_defaults_when_missing() {
        let json = r#"{"quorum": "250", "owner": "0x0101010101010101010101010101010101010101"}"#;
        let config: LedgerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.quorum, Amount::from(250u64));
        assert_eq!(config.terminal_votes, TerminalVotePolicy::Reject);

        let allow = config.with_terminal_votes(TerminalVotePolicy::Allow);
        let json = serde_json::to_string(&allow).unwrap();
        assert!(json.contains("\"allow\""));
    }
}
