//! Veil Hardware Abstraction Layer
//!
//! This crate defines the traits between the GAP layer, the private address
//! controller and the vendor link layer. The same GAP code runs against any
//! link layer that speaks the LE privacy HCI command set.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  GAP layer                              │
//! └─────────────────────────────────────────┘
//!        │ PrivateAddressController  ▲ EventHandler
//!        ▼                           │
//! ┌─────────────────────────────────────────┐
//! │  veil-controller                        │
//! └─────────────────────────────────────────┘
//!        │ LinkLayer (HCI commands / events)
//!        ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ H4 over       │       │ simulated     │
//! │ HciTransport  │       │ link layer    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`PrivateAddressController`] - Upstream privacy requests
//! - [`EventHandler`] - Completion callbacks
//! - [`LinkLayer`] - Downstream HCI command submission
//! - [`HciTransport`] - Byte transport for H4 framing

#![no_std]
#![deny(unsafe_code)]

pub mod controller;
pub mod error;
pub mod event;
pub mod link;
pub mod transport;

// Re-export key traits at crate root for convenience
pub use controller::PrivateAddressController;
pub use error::PrivacyError;
pub use event::{EventHandler, PrivacyEvent, ResolvingListAction, ResolvingListCompletion};
pub use link::LinkLayer;
pub use transport::HciTransport;
