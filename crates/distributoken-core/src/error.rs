use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DistributokenError {
    // ── Secret chain errors ──────────────────────────────────────────────────
    #[error("checksum mismatch: {checksum} is not the checksum of {hashed_secret}")]
    ChecksumMismatch { hashed_secret: String, checksum: String },

    #[error("secret does not match current hashed secret: {current}")]
    SecretMismatch { current: String },

    #[error("proposed hashed secret {0} is already the committed value")]
    StaleCommitment(String),

    // ── Gate errors ──────────────────────────────────────────────────────────
    #[error("caller {caller} is not the owner")]
    NotOwner { caller: String },

    #[error("sunset is active; ordinary transfers are frozen")]
    SunsetActive,

    // ── Ledger errors ────────────────────────────────────────────────────────
    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u128, have: u128 },

    #[error("malformed batch: {0}")]
    MalformedBatch(String),

    #[error("index {index} out of range: {count} records")]
    IndexOutOfRange { index: u64, count: u64 },

    #[error("credit would overflow total supply")]
    SupplyOverflow,

    #[error("supply mismatch: total supply {supply}, sum of balances {sum}")]
    SupplyMismatch { supply: u128, sum: u128 },

    // ── Instances ────────────────────────────────────────────────────────────
    #[error("unknown instance: {0}")]
    UnknownInstance(String),

    // ── Encoding ─────────────────────────────────────────────────────────────
    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}
