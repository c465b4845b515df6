/// ─── Distributoken Constants ────────────────────────────────────────────────
///
/// Widths of every fixed-size field that crosses the ledger boundary.
/// Digest widths refer to truncations of Keccak-256.

// ── Secret chain ─────────────────────────────────────────────────────────────

/// Length of a revealed secret.
pub const SECRET_LEN: usize = 16;

/// Length of a committed hashed secret: first 16 bytes of keccak256(secret).
pub const HASHED_SECRET_LEN: usize = 16;

/// Length of a checksum: first 4 bytes of keccak256(hashed_secret).
pub const CHECKSUM_LEN: usize = 4;

// ── Ledger ───────────────────────────────────────────────────────────────────

/// Account identifiers are 20-byte addresses.
pub const ACCOUNT_ID_LEN: usize = 20;

/// Instance handles share the address width.
pub const INSTANCE_ID_LEN: usize = 20;

/// Distribution memos are `bytes32`, right zero-padded.
pub const MEMO_LEN: usize = 32;

/// Tokens are indivisible.
pub const TOKEN_DECIMALS: u8 = 0;

/// Supply at deployment. Tokens only come into existence through distributions.
pub const INITIAL_SUPPLY: u128 = 0;
