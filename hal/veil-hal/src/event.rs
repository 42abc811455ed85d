//! Completion vocabulary delivered to the GAP layer

use veil_core::{Address, HciErrorCode, PeerAddressType, PrivacyMode};

/// Resolving list operation a completion refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResolvingListAction {
    Add {
        peer_address_type: PeerAddressType,
        peer_identity_address: Address,
    },
    Remove {
        peer_address_type: PeerAddressType,
        peer_identity_address: Address,
    },
    Clear,
    SetPrivacyMode {
        peer_address_type: PeerAddressType,
        peer_identity_address: Address,
        privacy_mode: PrivacyMode,
    },
}

/// Outcome of a resolving list operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResolvingListCompletion {
    pub action: ResolvingListAction,
    pub status: HciErrorCode,
}

impl ResolvingListCompletion {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Receives completions of accepted privacy requests
///
/// Callbacks run in the event-processing context, one at a time.
/// Implementations must not block.
pub trait EventHandler {
    /// An RPA was generated; [`Address::INVALID`] if generation failed
    fn on_resolvable_private_address_generated(&self, address: &Address);

    /// Host-side resolution finished
    fn on_private_address_resolved(&self, resolved: bool) {
        let _ = resolved;
    }

    /// A resolving list operation finished
    fn on_resolving_list_action_complete(&self, completion: &ResolvingListCompletion);
}

/// Completion as a value, for queue-based consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrivacyEvent {
    ResolvablePrivateAddressGenerated(Address),
    PrivateAddressResolved(bool),
    ResolvingListActionComplete(ResolvingListCompletion),
}
