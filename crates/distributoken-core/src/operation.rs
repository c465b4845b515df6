use std::fmt;

use crate::error::DistributokenError;
use crate::record::ChainState;
use crate::types::{AccountId, Balance, Memo, Secret};

/// The `(secret, newHashedSecret, newChecksum)` triple every authorized call
/// carries: reveal the current preimage, commit to the next one.
#[derive(Clone, Debug)]
pub struct ChainAdvance {
    pub secret: Secret,
    pub next: ChainState,
}

impl ChainAdvance {
    pub fn new(secret: Secret, next: ChainState) -> Self {
        Self { secret, next }
    }
}

/// The three chain-gated operation classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Distribute,
    SetOwner,
    SetSunset,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Distribute => "distribute",
            OperationKind::SetOwner => "set_owner",
            OperationKind::SetSunset => "set_sunset",
        })
    }
}

/// One `(receiver, value, memo)` element of a distribution batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionEntry {
    pub receiver: AccountId,
    pub value: Balance,
    pub memo: Memo,
}

impl DistributionEntry {
    pub fn new(receiver: AccountId, value: Balance, memo: Memo) -> Self {
        Self { receiver, value, memo }
    }

    /// Zip parallel `receivers`, `values`, `memos` into a batch.
    ///
    /// Fails with `MalformedBatch` on unequal lengths or any memo longer than
    /// 32 bytes; nothing is produced unless every element is well-formed.
    pub fn batch<M: AsRef<[u8]>>(
        receivers: &[AccountId],
        values: &[Balance],
        memos: &[M],
    ) -> Result<Vec<DistributionEntry>, DistributokenError> {
        if receivers.len() != values.len() || receivers.len() != memos.len() {
            return Err(DistributokenError::MalformedBatch(format!(
                "{} receivers, {} values, {} memos",
                receivers.len(),
                values.len(),
                memos.len()
            )));
        }
        receivers
            .iter()
            .zip(values)
            .zip(memos)
            .map(|((receiver, value), memo)| {
                Ok(DistributionEntry::new(*receiver, *value, Memo::from_bytes(memo.as_ref())?))
            })
            .collect()
    }
}
