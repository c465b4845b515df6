use serde::{Deserialize, Serialize};

use crate::operation::OperationKind;
use crate::types::{AccountId, Balance, Checksum, HashWidth, HashedSecret, Memo, Timestamp};

// ── ChainState ───────────────────────────────────────────────────────────────

/// The single live commitment of the secret chain.
///
/// Invariant (checked whenever a state is installed):
/// `checksum == first4(keccak256(hashed_secret))`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub hashed_secret: HashedSecret,
    pub checksum: Checksum,
}

impl ChainState {
    pub fn new(hashed_secret: HashedSecret, checksum: Checksum) -> Self {
        Self { hashed_secret, checksum }
    }
}

// ── DistributionRecord ───────────────────────────────────────────────────────

/// One entry of the append-only distribution log. Never mutated once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub timestamp: Timestamp,
    pub receiver: AccountId,
    pub value: Balance,
    pub memo: Memo,
}

// ── OwnerGateState ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerGateState {
    pub owner: AccountId,
    /// While set, ordinary transfers are rejected. Chain-gated operations are not.
    pub sunset: bool,
}

// ── TokenMeta ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    pub symbol: String,
    pub description: String,
    pub decimals: u8,
    pub deployed_at: Timestamp,
}

// ── LedgerConfig ─────────────────────────────────────────────────────────────

/// Secret truncation width per authorized operation.
///
/// Fixed at deployment and stored with the instance. The checksum width is
/// not configurable: a checksum is always 4 bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub distribute: HashWidth,
    pub set_owner: HashWidth,
    pub set_sunset: HashWidth,
}

impl LedgerConfig {
    pub fn width_for(&self, kind: OperationKind) -> HashWidth {
        match kind {
            OperationKind::Distribute => self.distribute,
            OperationKind::SetOwner => self.set_owner,
            OperationKind::SetSunset => self.set_sunset,
        }
    }
}
