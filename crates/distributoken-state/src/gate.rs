use distributoken_core::error::DistributokenError;
use distributoken_core::record::OwnerGateState;
use distributoken_core::types::AccountId;

/// Owner and sunset flag of one instance.
///
/// The setters are unconditional: the router only calls them after the
/// secret chain has advanced and `require_owner` has passed.
#[derive(Clone, Copy, Debug)]
pub struct OwnerGate {
    state: OwnerGateState,
}

impl OwnerGate {
    pub fn new(state: OwnerGateState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> OwnerGateState {
        self.state
    }

    pub fn owner(&self) -> AccountId {
        self.state.owner
    }

    pub fn sunset(&self) -> bool {
        self.state.sunset
    }

    pub fn require_owner(&self, caller: &AccountId) -> Result<(), DistributokenError> {
        if *caller != self.state.owner {
            return Err(DistributokenError::NotOwner { caller: caller.to_hex() });
        }
        Ok(())
    }

    /// Consulted by ordinary transfer paths only.
    pub fn require_not_sunset(&self) -> Result<(), DistributokenError> {
        if self.state.sunset {
            return Err(DistributokenError::SunsetActive);
        }
        Ok(())
    }

    pub fn set_owner(&mut self, new_owner: AccountId) {
        self.state.owner = new_owner;
    }

    pub fn set_sunset(&mut self, sunset: bool) {
        self.state.sunset = sunset;
    }
}
