use distributoken_core::constants::{CHECKSUM_LEN, HASHED_SECRET_LEN, INSTANCE_ID_LEN};
use distributoken_core::types::{
    AccountId, Checksum, HashWidth, HashedSecret, InstanceId, Secret, Timestamp,
};
use sha3::{Digest, Keccak256};

/// Keccak-256 (pre-standard padding, not NIST SHA3-256) of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Commitment to `secret`: first 16 bytes of keccak256(secret).
pub fn hash_secret(secret: &Secret) -> HashedSecret {
    let digest = keccak256(secret.as_bytes());
    let mut out = [0u8; HASHED_SECRET_LEN];
    out.copy_from_slice(&digest[..HASHED_SECRET_LEN]);
    HashedSecret(out)
}

/// Checksum of a commitment: first 4 bytes of keccak256(hashed_secret).
pub fn checksum_of(hashed_secret: &HashedSecret) -> Checksum {
    let digest = keccak256(hashed_secret.as_bytes());
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    Checksum(out)
}

/// True if the first `width` bytes of keccak256(secret) equal the first
/// `width` bytes of `committed`.
pub fn secret_matches(secret: &Secret, committed: &HashedSecret, width: HashWidth) -> bool {
    let n = width.bytes();
    keccak256(secret.as_bytes())[..n] == committed.as_bytes()[..n]
}

/// Derive a deployment handle with BLAKE3 over the deployer, the token
/// metadata, the initial commitment and a per-database deployment nonce.
pub fn instance_id(
    owner: &AccountId,
    symbol: &str,
    description: &str,
    initial: &HashedSecret,
    deployed_at: Timestamp,
    nonce: u64,
) -> InstanceId {
    let mut h = blake3::Hasher::new();
    h.update(owner.as_bytes());
    h.update(&(symbol.len() as u64).to_le_bytes());
    h.update(symbol.as_bytes());
    h.update(&(description.len() as u64).to_le_bytes());
    h.update(description.as_bytes());
    h.update(initial.as_bytes());
    h.update(&deployed_at.to_le_bytes());
    h.update(&nonce.to_le_bytes());
    let digest = h.finalize();
    let mut out = [0u8; INSTANCE_ID_LEN];
    out.copy_from_slice(&digest.as_bytes()[..INSTANCE_ID_LEN]);
    InstanceId(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_of_empty_input() {
        // Distinguishes Keccak-256 from NIST SHA3-256 (a7ffc6f8…).
        assert_eq!(
            hex_of(&keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn hashed_secret_and_checksum_are_prefixes() {
        let secret = Secret::from_bytes([9u8; 16]);
        let full = keccak256(secret.as_bytes());
        let hashed = hash_secret(&secret);
        assert_eq!(&hashed.0[..], &full[..16]);
        let check = checksum_of(&hashed);
        assert_eq!(&check.0[..], &keccak256(&hashed.0)[..4]);
    }

    #[test]
    fn four_byte_width_ignores_tail() {
        let secret = Secret::from_bytes([3u8; 16]);
        let mut committed = hash_secret(&secret);
        committed.0[15] ^= 0xFF;
        assert!(secret_matches(&secret, &committed, HashWidth::Four));
        assert!(!secret_matches(&secret, &committed, HashWidth::Sixteen));
    }

    #[test]
    fn instance_ids_differ_by_nonce() {
        let owner = AccountId::from_bytes([1u8; 20]);
        let h = HashedSecret([2u8; 16]);
        let a = instance_id(&owner, "THANKS", "thanks token", &h, 100, 0);
        let b = instance_id(&owner, "THANKS", "thanks token", &h, 100, 1);
        assert_ne!(a, b);
    }

    fn hex_of(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
