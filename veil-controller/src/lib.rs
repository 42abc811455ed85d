//! Private address controller implementations
//!
//! This crate provides the concrete [`PrivateAddressController`] defined in
//! veil-hal and the link layers it can drive:
//!
//! - [`Controller`] - Request tracking, resolving list mirror, completions
//! - [`SimLinkLayer`] - In-memory link layer for host tests and bring-up
//! - [`H4LinkLayer`] - HCI over a UART-style [`HciTransport`]
//! - [`ChannelEventSink`] - Completions forwarded to an embassy channel
//!
//! Logging goes to `defmt` or `log` depending on the enabled feature.
//!
//! [`PrivateAddressController`]: veil_hal::PrivateAddressController
//! [`HciTransport`]: veil_hal::HciTransport

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This must go first so the macros are visible in the other modules
#[macro_use]
mod fmt;

pub mod controller;
pub mod h4;
pub mod sim;
pub mod sink;

pub use controller::{Controller, Lifecycle, MAX_PENDING_REQUESTS, MAX_RESOLVING_LIST_SIZE};
pub use h4::{Capabilities, H4Error, H4LinkLayer};
pub use sim::{SimConfig, SimError, SimLinkLayer};
pub use sink::{ChannelEventSink, PrivacyEventChannel, PRIVACY_EVENT_CHANNEL_SIZE};
