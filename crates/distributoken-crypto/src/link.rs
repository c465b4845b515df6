use distributoken_core::operation::ChainAdvance;
use distributoken_core::record::ChainState;
use distributoken_core::types::{Checksum, HashedSecret, Secret};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::hash::{checksum_of, hash_secret};

/// One commit/reveal unit of the secret chain.
///
/// The holder keeps `secret` offline and publishes `hashed_secret` and
/// `checksum`. The secret is wiped from memory when the link is dropped.
#[derive(Clone)]
pub struct HashChainLink {
    secret: Secret,
    hashed_secret: HashedSecret,
    checksum: Checksum,
}

impl HashChainLink {
    /// Draw a fresh 16-byte secret from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self::from_secret(Secret::from_bytes(bytes))
    }

    /// Generate `n` independent links, e.g. to pre-plan a run of operations.
    pub fn generate_many(n: usize) -> Vec<Self> {
        (0..n).map(|_| Self::generate()).collect()
    }

    pub fn from_secret(secret: Secret) -> Self {
        let hashed_secret = hash_secret(&secret);
        let checksum = checksum_of(&hashed_secret);
        Self { secret, hashed_secret, checksum }
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn hashed_secret(&self) -> HashedSecret {
        self.hashed_secret
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// The public commitment this link installs.
    pub fn chain_state(&self) -> ChainState {
        ChainState::new(self.hashed_secret, self.checksum)
    }

    /// Reveal this link's secret and commit to `next`.
    pub fn advance_to(&self, next: &HashChainLink) -> ChainAdvance {
        ChainAdvance::new(self.secret.clone(), next.chain_state())
    }
}

impl std::fmt::Debug for HashChainLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HashChainLink {{ hashed_secret: {} }}", self.hashed_secret)
    }
}
