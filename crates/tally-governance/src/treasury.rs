//! Treasury custody for governance funds.
//!
//! Holds the balance that finalized proposals are paid from, and the
//! payout seam through which funds actually leave custody.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use parking_lot::RwLock;
use tally_types::{Address, Amount};
use crate::error::GovernanceError;

/// Delivers funds to a recipient.
///
/// An `Err` is the recipient-side rejection reason; the ledger treats it as
/// a failed finalize and keeps the proposal open.
pub trait Payout: Send {
    fn pay(&mut self, recipient: &Address, amount: Amount) -> Result<(), String>;
}

/// Custodied balance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Treasury {
    balance: Amount,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_balance(balance: Amount) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Accept funds. Returns the new balance.
    pub fn deposit(&mut self, amount: Amount) -> Result<Amount, GovernanceError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(GovernanceError::Overflow("treasury balance"))?;
        Ok(self.balance)
    }

    pub fn can_cover(&self, amount: Amount) -> bool {
        self.balance >= amount
    }

    /// Fails with `InsufficientFunds` unless the balance covers `amount`.
    pub fn ensure_covers(&self, amount: Amount) -> Result<(), GovernanceError> {
        if self.can_cover(amount) {
            Ok(())
        } else {
            Err(GovernanceError::InsufficientFunds {
                available: self.balance,
                required: amount,
            })
        }
    }

    pub(crate) fn debit(&mut self, amount: Amount) -> Result<Amount, GovernanceError> {
        self.ensure_covers(amount)?;
        self.balance = self.balance.saturating_sub(amount);
        Ok(self.balance)
    }

    /// Return funds taken by `debit` when the payout did not go through.
    pub(crate) fn refund(&mut self, amount: Amount) {
        self.balance = self.balance.saturating_add(amount);
    }
}

#[derive(Debug, Default)]
struct BookInner {
    credits: HashMap<Address, Amount>,
    rejecting: HashSet<Address>,
}

/// In-memory payout target that credits recipient accounts.
///
/// Clones share the same book, so a caller can hand one clone to the ledger
/// and keep another to observe payouts.
#[derive(Debug, Clone, Default)]
pub struct AccountBook {
    inner: Arc<RwLock<BookInner>>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make payouts to `recipient` fail until `accept` is called.
    pub fn reject(&self, recipient: Address) {
        self.inner.write().rejecting.insert(recipient);
    }

    pub fn accept(&self, recipient: &Address) {
        self.inner.write().rejecting.remove(recipient);
    }

    pub fn credited(&self, recipient: &Address) -> Amount {
        self.inner.read().credits.get(recipient).copied().unwrap_or(Amount::ZERO)
    }

    pub fn total_paid(&self) -> Amount {
        self.inner.read().credits.values().copied().sum()
    }
}

impl Payout for AccountBook {
    fn pay(&mut self, recipient: &Address, amount: Amount) -> Result<(), String> {
        let mut inner = self.inner.write();
        if inner.rejecting.contains(recipient) {
            return Err(format!("recipient {} refused payment", recipient));
        }
        let credit = inner.credits.entry(*recipient).or_insert(Amount::ZERO);
        *credit = credit
            .checked_add(amount)
            .ok_or_else(|| format!("recipient {} balance overflow", recipient))?;
        Ok(())
    }
}
