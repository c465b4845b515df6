use distributoken_core::error::DistributokenError;
use distributoken_core::operation::ChainAdvance;
use distributoken_core::record::ChainState;
use distributoken_core::types::HashWidth;
use distributoken_crypto::ChainVerifier;

/// Local check of a chain advance against the committed state, run before
/// asking for confirmation so a typo never reaches the ledger.
///
/// Runs the same verifier the ledger runs. The ledger re-checks everything
/// under its lock, including retired commitments; passing here is advisory.
pub fn preflight(
    current: &ChainState,
    advance: &ChainAdvance,
    width: HashWidth,
) -> Result<(), DistributokenError> {
    ChainVerifier::new(current)
        .advance(&advance.secret, &advance.next, width)
        .map(|_| ())
}
