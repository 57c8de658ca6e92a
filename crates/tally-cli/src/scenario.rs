//! Scenario scripts.
//!
//! A script seeds holder weights and then lists ledger operations in order.
//! Each step is executed against a fresh ledger and its outcome recorded;
//! a rejected step does not stop the run.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tally_governance::{
    AccountBook, Address, Amount, GovernanceError, GovernanceLedger, LedgerConfig, StaticWeights,
};

/// Parsed scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Initial holder weights
    #[serde(default)]
    pub weights: BTreeMap<Address, Amount>,
    /// Recipients whose payouts fail
    #[serde(default)]
    pub rejecting: Vec<Address>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// One ledger operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Deposit {
        from: Address,
        amount: Amount,
    },
    Propose {
        caller: Address,
        name: String,
        description: String,
        amount: Amount,
        recipient: Address,
    },
    Vote {
        caller: Address,
        id: u64,
        in_favor: bool,
    },
    VoteInFavor {
        caller: Address,
        id: u64,
    },
    Finalize {
        caller: Address,
        id: u64,
    },
    Cancel {
        caller: Address,
        id: u64,
    },
    /// Change a holder's weight between operations
    SetWeight {
        holder: Address,
        amount: Amount,
    },
    /// Let a previously rejecting recipient accept payouts again
    Accept {
        recipient: Address,
    },
}

impl Step {
    pub fn label(&self) -> String {
        match self {
            Step::Deposit { amount, .. } => format!("deposit {}", amount),
            Step::Propose { name, amount, .. } => format!("propose '{}' for {}", name, amount),
            Step::Vote { id, in_favor, .. } => {
                format!("vote {} on #{}", if *in_favor { "for" } else { "against" }, id)
            }
            Step::VoteInFavor { id, .. } => format!("vote for #{} (legacy)", id),
            Step::Finalize { id, .. } => format!("finalize #{}", id),
            Step::Cancel { id, .. } => format!("cancel #{}", id),
            Step::SetWeight { amount, .. } => format!("set weight {}", amount),
            Step::Accept { .. } => "accept payouts".to_string(),
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ok,
    Proposed(u64),
    Balance(Amount),
    Rejected(GovernanceError),
}

impl Outcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

/// Ledger plus the handles needed to inspect it after a run.
pub struct ScenarioRun {
    pub ledger: GovernanceLedger<StaticWeights>,
    pub book: AccountBook,
    pub outcomes: Vec<(Step, Outcome)>,
}

impl Script {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read script '{}': {}", path.display(), e))?;
        Self::parse(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse script '{}': {}", path.display(), e))
    }

    pub fn parse(src: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(src)?)
    }

    /// Execute every step against a new ledger built from `config`.
    pub fn run(&self, config: LedgerConfig) -> Result<ScenarioRun, GovernanceError> {
        let weights = StaticWeights::new();
        for (holder, amount) in &self.weights {
            weights.set(*holder, *amount);
        }

        let book = AccountBook::new();
        for recipient in &self.rejecting {
            book.reject(*recipient);
        }

        let mut ledger = GovernanceLedger::new(config, weights, Box::new(book.clone()))?;
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let outcome = match execute(&mut ledger, &book, step) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::debug!("Step '{}' rejected: {}", step.label(), err);
                    Outcome::Rejected(err)
                }
            };
            outcomes.push((step.clone(), outcome));
        }

        Ok(ScenarioRun { ledger, book, outcomes })
    }
}

fn execute(
    ledger: &mut GovernanceLedger<StaticWeights>,
    book: &AccountBook,
    step: &Step,
) -> Result<Outcome, GovernanceError> {
    let outcome = match step.clone() {
        Step::Deposit { from, amount } => Outcome::Balance(ledger.deposit(from, amount)?),
        Step::Propose { caller, name, description, amount, recipient } => {
            Outcome::Proposed(ledger.propose(name, description, amount, recipient, caller)?)
        }
        Step::Vote { caller, id, in_favor } => {
            ledger.vote(id, in_favor, caller)?;
            Outcome::Ok
        }
        Step::VoteInFavor { caller, id } => {
            ledger.vote_in_favor(id, caller)?;
            Outcome::Ok
        }
        Step::Finalize { caller, id } => {
            ledger.finalize(id, caller)?;
            Outcome::Ok
        }
        Step::Cancel { caller, id } => {
            ledger.cancel(id, caller)?;
            Outcome::Ok
        }
        Step::SetWeight { holder, amount } => {
            ledger.oracle().set(holder, amount);
            Outcome::Ok
        }
        Step::Accept { recipient } => {
            book.accept(&recipient);
            Outcome::Ok
        }
    };
    Ok(outcome)
}
