//! HCI codec for the LE privacy command set
//!
//! This crate defines the commands the private address controller sends to
//! a link layer and the events that report their completion, using the
//! UART (H4) transport framing:
//!
//! ```text
//! Command: ┌──────┬────────┬────────┬────────────┐
//!          │ 0x01 │ OPCODE │ LENGTH │ PARAMETERS │
//!          │ 1B   │ 2B LE  │ 1B     │ 0–39B      │
//!          └──────┴────────┴────────┴────────────┘
//! Event:   ┌──────┬──────┬────────┬────────────┐
//!          │ 0x04 │ CODE │ LENGTH │ PARAMETERS │
//!          │ 1B   │ 1B   │ 1B     │ 0–255B     │
//!          └──────┴──────┴────────┴────────────┘
//! ```
//!
//! Multi-byte fields, addresses and keys are little-endian on the wire.

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod event;
pub mod opcode;
pub mod packet;

pub use command::HciCommand;
pub use event::{EventParser, HciEvent, EVENT_COMMAND_COMPLETE, EVENT_COMMAND_STATUS};
pub use packet::{PacketError, PACKET_TYPE_COMMAND, PACKET_TYPE_EVENT};
