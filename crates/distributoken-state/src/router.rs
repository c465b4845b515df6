use std::collections::BTreeMap;
use std::sync::Arc;

use distributoken_core::constants::TOKEN_DECIMALS;
use distributoken_core::error::DistributokenError;
use distributoken_core::operation::{ChainAdvance, DistributionEntry, OperationKind};
use distributoken_core::record::{
    ChainState, DistributionRecord, LedgerConfig, OwnerGateState, TokenMeta,
};
use distributoken_core::types::{AccountId, Balance, HashedSecret, InstanceId, Memo, RecordIndex, Timestamp};
use distributoken_crypto::hash::instance_id;
use distributoken_crypto::verifier::ChainVerifier;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::db::{InstanceStore, SharedStore, StagedMutations, StateDb};
use crate::gate::OwnerGate;
use crate::ledger::DistributionLedger;

/// Everything observable about an instance, for before/after comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub chain: ChainState,
    pub gate: OwnerGateState,
    pub total_supply: Balance,
    pub balances: BTreeMap<AccountId, Balance>,
    pub allowances: BTreeMap<(AccountId, AccountId), Balance>,
    pub records: Vec<DistributionRecord>,
}

// ── Distributoken ─────────────────────────────────────────────────────────────

/// One deployed ledger instance.
///
/// Every chain-gated operation runs under the instance's write lock: the
/// secret is checked, the owner is checked, the effect is staged, and the
/// effect plus the new commitment land in one storage transaction. The lock
/// belongs to the instance, not the handle, so two callers racing on the same
/// secret are serialized even through separately opened handles, and the
/// second finds the chain already moved.
pub struct Distributoken {
    id: InstanceId,
    store: SharedStore,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
}

impl Distributoken {
    /// Create a new instance owned by `owner` with `initial` as the first
    /// commitment. Supply starts at zero and sunset is off.
    pub fn deploy(
        db: &StateDb,
        owner: AccountId,
        symbol: &str,
        description: &str,
        initial: ChainState,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DistributokenError> {
        ChainVerifier::check_commitment(&initial)?;

        let deployed_at = clock.now();
        let id = instance_id(
            &owner,
            symbol,
            description,
            &initial.hashed_secret,
            deployed_at,
            db.instance_count(),
        );
        let meta = TokenMeta {
            symbol: symbol.to_string(),
            description: description.to_string(),
            decimals: TOKEN_DECIMALS,
            deployed_at,
        };

        let store = db.instance_tree(&id)?;
        let staged = StagedMutations {
            token: Some(meta.clone()),
            config: Some(config),
            chain: Some(initial),
            gate: Some(OwnerGateState { owner, sunset: false }),
            total_supply: Some(0),
            ..Default::default()
        };
        store.commit(&staged)?;
        db.register(&id, &meta)?;
        let store = db.shared_store(&id)?;

        info!(
            instance = %id,
            owner = %owner,
            symbol,
            hashed_secret = %initial.hashed_secret,
            "deployed instance"
        );
        Ok(Self { id, store, config, clock })
    }

    /// Reopen a previously deployed instance.
    pub fn open(db: &StateDb, id: &InstanceId, clock: Arc<dyn Clock>) -> Result<Self, DistributokenError> {
        let config = db.instance(id)?.config()?;
        let store = db.shared_store(id)?;
        Ok(Self { id: *id, store, config, clock })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    // ── Chain-gated operations ────────────────────────────────────────────────

    /// Credit every `(receiver, value, memo)` triple and log it, advancing the
    /// chain once for the whole batch.
    pub fn distribute<M: AsRef<[u8]>>(
        &self,
        caller: &AccountId,
        advance: &ChainAdvance,
        receivers: &[AccountId],
        values: &[Balance],
        memos: &[M],
    ) -> Result<(), DistributokenError> {
        self.authorize(caller, advance, OperationKind::Distribute, |store, staged, _, now| {
            let entries = DistributionEntry::batch(receivers, values, memos)?;
            DistributionLedger::new(store, staged).distribute(&entries, now)
        })
    }

    /// Single-receiver distribution.
    pub fn gift(
        &self,
        caller: &AccountId,
        advance: &ChainAdvance,
        receiver: AccountId,
        value: Balance,
        memo: Memo,
    ) -> Result<(), DistributokenError> {
        self.authorize(caller, advance, OperationKind::Distribute, |store, staged, _, now| {
            let entry = DistributionEntry::new(receiver, value, memo);
            DistributionLedger::new(store, staged).distribute(&[entry], now)
        })
    }

    pub fn set_owner(
        &self,
        caller: &AccountId,
        advance: &ChainAdvance,
        new_owner: AccountId,
    ) -> Result<(), DistributokenError> {
        self.authorize(caller, advance, OperationKind::SetOwner, |_, _, gate, _| {
            gate.set_owner(new_owner);
            Ok(())
        })
    }

    pub fn set_sunset(
        &self,
        caller: &AccountId,
        advance: &ChainAdvance,
        sunset: bool,
    ) -> Result<(), DistributokenError> {
        self.authorize(caller, advance, OperationKind::SetSunset, |_, _, gate, _| {
            gate.set_sunset(sunset);
            Ok(())
        })
    }

    /// Verify, check ownership, stage the effect, then commit the effect and
    /// the new commitment together. Any error drops the staged changes.
    fn authorize<F>(
        &self,
        caller: &AccountId,
        advance: &ChainAdvance,
        kind: OperationKind,
        effect: F,
    ) -> Result<(), DistributokenError>
    where
        F: FnOnce(&InstanceStore, &mut StagedMutations, &mut OwnerGate, Timestamp) -> Result<(), DistributokenError>,
    {
        let store = self.store.write();
        let result = self.apply_authorized(&store, caller, advance, kind, effect);

        match result {
            Ok(records) => {
                info!(
                    instance = %self.id,
                    op = %kind,
                    records,
                    hashed_secret = %advance.next.hashed_secret,
                    "chain advanced"
                );
                Ok(())
            }
            Err(e) => {
                warn!(instance = %self.id, op = %kind, error = %e, "rejected");
                Err(e)
            }
        }
    }

    fn apply_authorized<F>(
        &self,
        store: &InstanceStore,
        caller: &AccountId,
        advance: &ChainAdvance,
        kind: OperationKind,
        effect: F,
    ) -> Result<usize, DistributokenError>
    where
        F: FnOnce(&InstanceStore, &mut StagedMutations, &mut OwnerGate, Timestamp) -> Result<(), DistributokenError>,
    {
        let current = store.chain()?;
        let next = ChainVerifier::new(&current).advance(
            &advance.secret,
            &advance.next,
            self.config.width_for(kind),
        )?;
        if store.is_spent(&next.hashed_secret)? {
            return Err(DistributokenError::StaleCommitment(next.hashed_secret.to_hex()));
        }
        let mut gate = OwnerGate::new(store.gate()?);
        gate.require_owner(caller)?;

        let mut staged = StagedMutations::default();
        effect(store, &mut staged, &mut gate, self.clock.now())?;
        staged.gate = Some(gate.state());
        staged.chain = Some(next);
        staged.spent.push(current.hashed_secret);
        store.commit(&staged)?;
        Ok(staged.records.len())
    }

    // ── Ordinary token surface ────────────────────────────────────────────────

    pub fn transfer(&self, from: &AccountId, to: &AccountId, value: Balance) -> Result<(), DistributokenError> {
        self.ordinary("transfer", |store, staged| {
            DistributionLedger::new(store, staged).transfer(from, to, value)
        })
    }

    pub fn approve(&self, owner: &AccountId, spender: &AccountId, value: Balance) -> Result<(), DistributokenError> {
        self.ordinary("approve", |store, staged| {
            DistributionLedger::new(store, staged).approve(owner, spender, value);
            Ok(())
        })
    }

    pub fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        value: Balance,
    ) -> Result<(), DistributokenError> {
        self.ordinary("transfer_from", |store, staged| {
            DistributionLedger::new(store, staged).transfer_from(spender, from, to, value)
        })
    }

    fn ordinary<F>(&self, op: &'static str, effect: F) -> Result<(), DistributokenError>
    where
        F: FnOnce(&InstanceStore, &mut StagedMutations) -> Result<(), DistributokenError>,
    {
        let store = self.store.write();
        let result = Self::apply_ordinary(&store, effect);
        if let Err(e) = &result {
            warn!(instance = %self.id, op, error = %e, "rejected");
        }
        result
    }

    fn apply_ordinary<F>(store: &InstanceStore, effect: F) -> Result<(), DistributokenError>
    where
        F: FnOnce(&InstanceStore, &mut StagedMutations) -> Result<(), DistributokenError>,
    {
        OwnerGate::new(store.gate()?).require_not_sunset()?;
        let mut staged = StagedMutations::default();
        effect(store, &mut staged)?;
        store.commit(&staged)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn chain_state(&self) -> Result<ChainState, DistributokenError> {
        self.store.read().chain()
    }

    pub fn hashed_secret(&self) -> Result<HashedSecret, DistributokenError> {
        Ok(self.chain_state()?.hashed_secret)
    }

    pub fn owner(&self) -> Result<AccountId, DistributokenError> {
        Ok(self.store.read().gate()?.owner)
    }

    pub fn sunset(&self) -> Result<bool, DistributokenError> {
        Ok(self.store.read().gate()?.sunset)
    }

    pub fn balance_of(&self, account: &AccountId) -> Result<Balance, DistributokenError> {
        self.store.read().balance(account)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<Balance, DistributokenError> {
        self.store.read().allowance(owner, spender)
    }

    pub fn total_supply(&self) -> Result<Balance, DistributokenError> {
        self.store.read().total_supply()
    }

    pub fn token_meta(&self) -> Result<TokenMeta, DistributokenError> {
        self.store.read().token_meta()
    }

    pub fn distribution(&self, index: RecordIndex) -> Result<DistributionRecord, DistributokenError> {
        self.store.read().distribution(index)
    }

    pub fn distribution_count(&self) -> Result<u64, DistributokenError> {
        self.store.read().distribution_count()
    }

    /// All observable state, read under one lock.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, DistributokenError> {
        let store = self.store.read();
        Ok(LedgerSnapshot {
            chain: store.chain()?,
            gate: store.gate()?,
            total_supply: store.total_supply()?,
            balances: store.balances()?,
            allowances: store.allowances()?,
            records: store.distributions()?,
        })
    }

    /// Recompute the sum of balances and compare it to total supply.
    pub fn audit_supply(&self) -> Result<Balance, DistributokenError> {
        let store = self.store.read();
        let supply = store.total_supply()?;
        let sum = store
            .balances()?
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .ok_or(DistributokenError::SupplyOverflow)?;
        if sum != supply {
            return Err(DistributokenError::SupplyMismatch { supply, sum });
        }
        Ok(supply)
    }
}
