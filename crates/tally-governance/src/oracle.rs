//! Voting weight lookup.
//!
//! The ledger never stores weight: it asks the oracle at the moment of each
//! call and uses whatever balance that call observes.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tally_types::{Address, Amount};

/// Synchronous balance query against the external weight ledger.
pub trait WeightOracle {
    /// Current weight of `holder`. Must not mutate ledger-visible state.
    fn balance_of(&self, holder: &Address) -> Amount;
}

/// Balance query for oracles that live behind a network hop.
#[async_trait::async_trait]
pub trait AsyncWeightOracle: Send + Sync {
    async fn balance_of(&self, holder: &Address) -> Amount;
}

/// In-memory weights, shared between clones.
///
/// Used by the CLI scenario runner and tests; balances may be changed
/// between ledger calls to model transfers on the weight ledger.
#[derive(Debug, Clone, Default)]
pub struct StaticWeights {
    balances: Arc<RwLock<HashMap<Address, Amount>>>,
}

impl StaticWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style initial balance.
    pub fn with(self, holder: Address, amount: Amount) -> Self {
        self.set(holder, amount);
        self
    }

    pub fn set(&self, holder: Address, amount: Amount) {
        if amount.is_zero() {
            self.balances.write().remove(&holder);
        } else {
            self.balances.write().insert(holder, amount);
        }
    }

    pub fn holders(&self) -> usize {
        self.balances.read().len()
    }

    fn lookup(&self, holder: &Address) -> Amount {
        self.balances.read().get(holder).copied().unwrap_or(Amount::ZERO)
    }
}

impl WeightOracle for StaticWeights {
    fn balance_of(&self, holder: &Address) -> Amount {
        self.lookup(holder)
    }
}

#[async_trait::async_trait]
impl AsyncWeightOracle for StaticWeights {
    async fn balance_of(&self, holder: &Address) -> Amount {
        self.lookup(holder)
    }
}
