use distributoken_core::error::DistributokenError;
use distributoken_core::record::ChainState;
use distributoken_core::types::{HashWidth, Secret};

use crate::hash::{checksum_of, secret_matches};

/// Validates a reveal against the live commitment and issues the next one.
///
/// Stateless: the caller owns the live `ChainState` and decides whether to
/// install the returned successor. Nothing here mutates anything.
pub struct ChainVerifier<'a> {
    current: &'a ChainState,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(current: &'a ChainState) -> Self {
        Self { current }
    }

    /// Check the `checksum == first4(keccak256(hashed_secret))` invariant.
    pub fn check_commitment(state: &ChainState) -> Result<(), DistributokenError> {
        if checksum_of(&state.hashed_secret) != state.checksum {
            return Err(DistributokenError::ChecksumMismatch {
                hashed_secret: state.hashed_secret.to_hex(),
                checksum: state.checksum.to_hex(),
            });
        }
        Ok(())
    }

    /// Verify `secret` against the current commitment at `width` and return
    /// `proposed` as the next live state.
    ///
    /// Checks run in order: proposed checksum, secret, commitment reuse.
    pub fn advance(
        &self,
        secret: &Secret,
        proposed: &ChainState,
        width: HashWidth,
    ) -> Result<ChainState, DistributokenError> {
        Self::check_commitment(proposed)?;
        if !secret_matches(secret, &self.current.hashed_secret, width) {
            return Err(DistributokenError::SecretMismatch {
                current: self.current.hashed_secret.to_hex(),
            });
        }
        if proposed.hashed_secret == self.current.hashed_secret {
            return Err(DistributokenError::StaleCommitment(proposed.hashed_secret.to_hex()));
        }
        Ok(*proposed)
    }
}
