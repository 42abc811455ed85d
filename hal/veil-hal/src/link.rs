//! Link-layer (vendor) interface
//!
//! The controller talks to the radio through HCI commands and learns the
//! outcome from Command Complete / Command Status events. Transports
//! deliver events either by calling the controller's inbound hook or by
//! returning them from [`LinkLayer::poll_event`].

use veil_protocol::{HciCommand, HciEvent};

/// Downstream link layer
pub trait LinkLayer {
    /// Error type for command submission
    type Error: core::fmt::Debug;

    /// Submit a command; its completion arrives as an [`HciEvent`]
    fn send_command(&mut self, command: &HciCommand) -> Result<(), Self::Error>;

    /// Whether the link layer supports the LL privacy feature
    fn supports_ll_privacy(&self) -> bool;

    /// Resolving list capacity
    fn resolving_list_size(&self) -> u8;

    /// Whether advertising, scanning or initiating is active
    fn is_radio_active(&self) -> bool {
        false
    }

    /// Next pending event for polled transports
    fn poll_event(&mut self) -> Option<HciEvent> {
        None
    }
}
