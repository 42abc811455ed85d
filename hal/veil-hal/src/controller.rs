//! Private address controller capability

use veil_core::{Address, Irk, PeerAddressType, PrivacyMode, ResolvableAddressTimeout};

use crate::error::PrivacyError;
use crate::event::EventHandler;

/// Controller-level BLE privacy
///
/// Requests return `Ok(())` when accepted; the outcome arrives later through
/// the registered [`EventHandler`]. At most one RPA generation and one
/// resolution may be outstanding at a time.
///
/// `'h` is the lifetime of the registered handler. The controller only
/// borrows it.
pub trait PrivateAddressController<'h> {
    /// Bring the controller up; calling it again has no effect
    fn initialize(&mut self) -> Result<(), PrivacyError>;

    /// Shut the controller down; outstanding requests are never reported
    fn terminate(&mut self) -> Result<(), PrivacyError>;

    /// Start generating an RPA from `local_irk`
    ///
    /// Completes with `on_resolvable_private_address_generated`.
    fn generate_resolvable_private_address(&mut self, local_irk: &Irk) -> Result<(), PrivacyError>;

    /// Generate an NRPA synchronously; [`Address::INVALID`] on failure
    fn generate_non_resolvable_private_address(&mut self) -> Address;

    /// Start checking whether `address` was generated from `irk`
    ///
    /// Completes with `on_private_address_resolved`. Implementations without
    /// host-side resolution reject the request.
    fn resolve_private_address(&mut self, address: &Address, irk: &Irk) -> Result<(), PrivacyError> {
        let _ = (address, irk);
        Err(PrivacyError::Unsupported)
    }

    /// Whether the link layer resolves and generates RPAs itself
    fn is_ll_privacy_supported(&self) -> bool;

    /// Enable or disable link-layer address resolution
    fn set_ll_address_resolution(&mut self, enable: bool) -> Result<(), PrivacyError>;

    /// Set the rotation period of link-layer generated RPAs
    fn set_ll_resolvable_private_address_timeout(
        &mut self,
        timeout: ResolvableAddressTimeout,
    ) -> Result<(), PrivacyError>;

    /// Number of resolving list entries the link layer holds; 0 without LL privacy
    fn read_resolving_list_capacity(&self) -> u8;

    /// Completes with `on_resolving_list_action_complete`
    fn add_device_to_resolving_list(
        &mut self,
        peer_address_type: PeerAddressType,
        peer_identity_address: &Address,
        peer_irk: &Irk,
        local_irk: &Irk,
    ) -> Result<(), PrivacyError>;

    /// Completes with `on_resolving_list_action_complete`
    fn remove_device_from_resolving_list(
        &mut self,
        peer_address_type: PeerAddressType,
        peer_identity_address: &Address,
    ) -> Result<(), PrivacyError>;

    /// Completes with `on_resolving_list_action_complete`
    fn clear_resolving_list(&mut self) -> Result<(), PrivacyError>;

    /// Completes with `on_resolving_list_action_complete`
    fn set_peer_privacy_mode(
        &mut self,
        peer_address_type: PeerAddressType,
        peer_address: &Address,
        privacy_mode: PrivacyMode,
    ) -> Result<(), PrivacyError>;

    /// Replace the completion handler; `None` drops completions
    fn set_event_handler(&mut self, handler: Option<&'h dyn EventHandler>);
}
