//! BLE GAP privacy type vocabulary
//!
//! This crate contains the hardware-independent types the private address
//! controller is parameterized by:
//!
//! - Strongly typed enumerations ([`SafeEnum`])
//! - Tick-unit checked durations ([`Duration`])
//! - Device addresses and identity resolving keys
//! - GAP enumerations and HCI status codes
//! - RPA / NRPA construction (`ah` over AES-128)
//! - Persisted privacy configuration

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod safe_enum;

pub mod address;
pub mod config;
pub mod crypto;
pub mod duration;
pub mod gap;
pub mod status;

pub use address::{Address, AddressKind, Irk};
pub use config::{ConfigError, PrivacyConfig};
pub use duration::{
    duration_cast, AdvDuration, AdvInterval, ConnInterval, Duration, Microseconds, Milliseconds,
    OutOfRange, ResolvableAddressTimeout, ScanDuration, ScanInterval, ScanPeriod, ScanWindow, Seconds,
    SupervisionTimeout,
};
pub use gap::{AdvertisingEventProperties, OwnAddressType, PeerAddressType, PrivacyMode};
pub use safe_enum::SafeEnum;
pub use status::HciErrorCode;
