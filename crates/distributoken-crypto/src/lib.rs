pub mod hash;
pub mod link;
pub mod verifier;

pub use hash::{checksum_of, hash_secret, instance_id, keccak256, secret_matches};
pub use link::HashChainLink;
pub use verifier::ChainVerifier;
