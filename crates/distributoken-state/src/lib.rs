//! distributoken-state
//!
//! The ledger instance: persistent storage, the owner gate, the distribution
//! ledger, and the router that binds every chain-gated operation to exactly
//! one advance of the secret chain.

pub mod clock;
pub mod db;
pub mod gate;
pub mod ledger;
pub mod router;

pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{InstanceStore, StagedMutations, StateDb};
pub use gate::OwnerGate;
pub use ledger::DistributionLedger;
pub use router::{Distributoken, LedgerSnapshot};
