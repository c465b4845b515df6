use distributoken_core::error::DistributokenError;
use distributoken_core::operation::DistributionEntry;
use distributoken_core::record::DistributionRecord;
use distributoken_core::types::{AccountId, Balance, Timestamp};

use crate::db::{InstanceStore, StagedMutations};

/// Balance accounting and the append-only distribution log.
///
/// Reads fall through the staged mutations to the committed store, so a
/// transition that touches an account twice sees its own earlier writes.
/// Nothing here writes to the store; a failed call leaves `staged` to be
/// discarded by the caller.
pub struct DistributionLedger<'a> {
    store: &'a InstanceStore,
    staged: &'a mut StagedMutations,
}

impl<'a> DistributionLedger<'a> {
    pub fn new(store: &'a InstanceStore, staged: &'a mut StagedMutations) -> Self {
        Self { store, staged }
    }

    fn balance(&self, id: &AccountId) -> Result<Balance, DistributokenError> {
        match self.staged.balances.get(id) {
            Some(b) => Ok(*b),
            None => self.store.balance(id),
        }
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance, DistributokenError> {
        match self.staged.allowances.get(&(*owner, *spender)) {
            Some(v) => Ok(*v),
            None => self.store.allowance(owner, spender),
        }
    }

    fn total_supply(&self) -> Result<Balance, DistributokenError> {
        match self.staged.total_supply {
            Some(s) => Ok(s),
            None => self.store.total_supply(),
        }
    }

    fn credit(&mut self, id: &AccountId, value: Balance) -> Result<(), DistributokenError> {
        let balance = self
            .balance(id)?
            .checked_add(value)
            .ok_or(DistributokenError::SupplyOverflow)?;
        self.staged.balances.insert(*id, balance);
        Ok(())
    }

    fn debit(&mut self, id: &AccountId, value: Balance) -> Result<(), DistributokenError> {
        let have = self.balance(id)?;
        if have < value {
            return Err(DistributokenError::InsufficientBalance { need: value, have });
        }
        self.staged.balances.insert(*id, have - value);
        Ok(())
    }

    // ── Distribution ─────────────────────────────────────────────────────────

    /// Append one record per entry, in input order, crediting each receiver
    /// and growing total supply by the same amount.
    pub fn distribute(
        &mut self,
        entries: &[DistributionEntry],
        now: Timestamp,
    ) -> Result<(), DistributokenError> {
        let mut supply = self.total_supply()?;
        for entry in entries {
            supply = supply
                .checked_add(entry.value)
                .ok_or(DistributokenError::SupplyOverflow)?;
            self.credit(&entry.receiver, entry.value)?;
            self.staged.records.push(DistributionRecord {
                timestamp: now,
                receiver: entry.receiver,
                value: entry.value,
                memo: entry.memo,
            });
        }
        self.staged.total_supply = Some(supply);
        Ok(())
    }

    // ── Ordinary token movement ──────────────────────────────────────────────

    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        value: Balance,
    ) -> Result<(), DistributokenError> {
        self.debit(from, value)?;
        self.credit(to, value)
    }

    /// Set (not add to) the amount `spender` may move out of `owner`.
    pub fn approve(&mut self, owner: &AccountId, spender: &AccountId, value: Balance) {
        self.staged.allowances.insert((*owner, *spender), value);
    }

    /// Move `value` from `from` to `to` on behalf of `spender`, consuming
    /// allowance. An allowance shortfall reports as insufficient balance.
    pub fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        value: Balance,
    ) -> Result<(), DistributokenError> {
        let allowed = self.allowance(from, spender)?;
        if allowed < value {
            return Err(DistributokenError::InsufficientBalance { need: value, have: allowed });
        }
        self.transfer(from, to, value)?;
        self.staged.allowances.insert((*from, *spender), allowed - value);
        Ok(())
    }
}
