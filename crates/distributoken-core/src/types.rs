use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{
    ACCOUNT_ID_LEN, CHECKSUM_LEN, HASHED_SECRET_LEN, INSTANCE_ID_LEN, MEMO_LEN, SECRET_LEN,
};
use crate::error::DistributokenError;

/// Token amount. Tokens are indivisible, so this is a plain count.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Zero-based position in the distribution log.
pub type RecordIndex = u64;

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Text form used to exchange secrets, hashes and checksums with people.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    Hex,
    Base58,
}

impl Encoding {
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Hex => hex::encode(bytes),
            Encoding::Base58 => bs58::encode(bytes).into_string(),
        }
    }

    /// Decode exactly `N` bytes. Hex input may carry a `0x` prefix.
    pub fn decode<const N: usize>(self, s: &str) -> Result<[u8; N], DistributokenError> {
        let s = s.trim();
        let bytes = match self {
            Encoding::Hex => hex::decode(strip_0x(s))
                .map_err(|e| DistributokenError::InvalidEncoding(format!("{s:?}: {e}")))?,
            Encoding::Base58 => bs58::decode(s)
                .into_vec()
                .map_err(|e| DistributokenError::InvalidEncoding(format!("{s:?}: {e}")))?,
        };
        <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
            DistributokenError::InvalidEncoding(format!(
                "{s:?}: expected {N} bytes, got {}",
                bytes.len()
            ))
        })
    }
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

fn parse_address<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let digits = strip_0x(s.trim());
    if digits.len() != N * 2 {
        return Err(format!("{s:?} must be {} hex characters", N * 2));
    }
    let bytes = hex::decode(digits).map_err(|e| format!("{s:?}: {e}"))?;
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ── AccountId ────────────────────────────────────────────────────────────────

/// 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    pub fn from_bytes(b: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, DistributokenError> {
        parse_address(s).map(Self).map_err(DistributokenError::InvalidAccount)
    }
}

impl FromStr for AccountId {
    type Err = DistributokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({}…)", &self.to_hex()[..10])
    }
}

// ── InstanceId ───────────────────────────────────────────────────────────────

/// Handle of a deployed ledger instance, the counterpart of a contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub [u8; INSTANCE_ID_LEN]);

impl InstanceId {
    pub fn as_bytes(&self) -> &[u8; INSTANCE_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, DistributokenError> {
        parse_address(s).map(Self).map_err(DistributokenError::UnknownInstance)
    }
}

impl FromStr for InstanceId {
    type Err = DistributokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({}…)", &self.to_hex()[..10])
    }
}

// ── Secret ───────────────────────────────────────────────────────────────────

/// A revealed chain secret. Never persisted; wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_LEN]);

impl Secret {
    pub fn from_bytes(b: [u8; SECRET_LEN]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }

    pub fn encode(&self, encoding: Encoding) -> String {
        encoding.encode(&self.0)
    }

    pub fn decode(encoding: Encoding, s: &str) -> Result<Self, DistributokenError> {
        encoding.decode(s).map(Self)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

// ── HashedSecret ─────────────────────────────────────────────────────────────

/// Commitment to the next secret: first 16 bytes of keccak256(secret).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashedSecret(pub [u8; HASHED_SECRET_LEN]);

impl HashedSecret {
    pub fn as_bytes(&self) -> &[u8; HASHED_SECRET_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn encode(&self, encoding: Encoding) -> String {
        encoding.encode(&self.0)
    }

    pub fn decode(encoding: Encoding, s: &str) -> Result<Self, DistributokenError> {
        encoding.decode(s).map(Self)
    }
}

impl fmt::Display for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashedSecret({})", self.to_hex())
    }
}

// ── Checksum ─────────────────────────────────────────────────────────────────

/// First 4 bytes of keccak256(hashed_secret). Catches transcription errors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(pub [u8; CHECKSUM_LEN]);

impl Checksum {
    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn encode(&self, encoding: Encoding) -> String {
        encoding.encode(&self.0)
    }

    pub fn decode(encoding: Encoding, s: &str) -> Result<Self, DistributokenError> {
        encoding.decode(s).map(Self)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

// ── Memo ─────────────────────────────────────────────────────────────────────

/// Opaque 32-byte distribution memo, right zero-padded.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Memo(pub [u8; MEMO_LEN]);

impl Memo {
    /// Pad `bytes` to 32 bytes. Longer input is a malformed batch element.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DistributokenError> {
        if bytes.len() > MEMO_LEN {
            return Err(DistributokenError::MalformedBatch(format!(
                "memo is {} bytes; maximum is {MEMO_LEN}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; MEMO_LEN];
        arr[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn from_text(text: &str) -> Result<Self, DistributokenError> {
        Self::from_bytes(text.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; MEMO_LEN] {
        &self.0
    }

    /// Memo bytes without the zero padding.
    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        &self.0[..end]
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.trimmed()) {
            Ok(text) if text.chars().all(|c| !c.is_control()) => f.write_str(text),
            _ => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Memo({self})")
    }
}

// ── HashWidth ────────────────────────────────────────────────────────────────

/// How many leading bytes of keccak256(secret) must match the committed hash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HashWidth {
    Four,
    #[default]
    Sixteen,
}

impl HashWidth {
    pub fn bytes(self) -> usize {
        match self {
            HashWidth::Four => CHECKSUM_LEN,
            HashWidth::Sixteen => HASHED_SECRET_LEN,
        }
    }
}

impl TryFrom<u8> for HashWidth {
    type Error = DistributokenError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            4 => Ok(HashWidth::Four),
            16 => Ok(HashWidth::Sixteen),
            other => Err(DistributokenError::InvalidEncoding(format!(
                "hash width must be 4 or 16, got {other}"
            ))),
        }
    }
}

impl From<HashWidth> for u8 {
    fn from(w: HashWidth) -> u8 {
        w.bytes() as u8
    }
}
