//! GAP enumerations used by the privacy layer
//!
//! Raw values match the HCI parameter encodings so they can be written to
//! command packets without translation.

use crate::safe_enum::safe_enum;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

safe_enum! {
    /// Address type of a peer identity address (resolving list, privacy mode)
    pub enum PeerAddressType: u8 as PeerAddressTypeKind {
        /// Public device address or public identity address
        PUBLIC = 0x00,
        /// Random device address or random (static) identity address
        RANDOM = 0x01,
    }
}

safe_enum! {
    /// Privacy mode applied to a resolving list entry
    pub enum PrivacyMode: u8 as PrivacyModeKind {
        /// Only accept the peer's RPA once its IRK is known
        NETWORK = 0x00,
        /// Also accept the peer's identity address
        DEVICE = 0x01,
    }
}

safe_enum! {
    /// Address type used by the local device for its own PDUs
    pub enum OwnAddressType: u8 as OwnAddressTypeKind {
        /// Public device address
        PUBLIC = 0x00,
        /// Random device address
        RANDOM = 0x01,
        /// Controller-generated RPA, public address if no IRK matches
        RESOLVABLE_PRIVATE_ADDRESS_PUBLIC_FALLBACK = 0x02,
        /// Controller-generated RPA, random address if no IRK matches
        RESOLVABLE_PRIVATE_ADDRESS_RANDOM_FALLBACK = 0x03,
    }
}

impl OwnAddressType {
    /// Check whether the controller generates the address from the resolving list
    pub fn uses_ll_privacy(&self) -> bool {
        *self == Self::RESOLVABLE_PRIVATE_ADDRESS_PUBLIC_FALLBACK
            || *self == Self::RESOLVABLE_PRIVATE_ADDRESS_RANDOM_FALLBACK
    }
}

/// Advertising event properties (LE Set Extended Advertising Parameters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdvertisingEventProperties(u16);

impl AdvertisingEventProperties {
    const CONNECTABLE: u16 = 1 << 0;
    const SCANNABLE: u16 = 1 << 1;
    const DIRECTED: u16 = 1 << 2;
    const HIGH_DUTY_CYCLE: u16 = 1 << 3;
    const LEGACY: u16 = 1 << 4;
    const OMIT_ADVERTISER_ADDRESS: u16 = 1 << 5;
    const INCLUDE_TX_POWER: u16 = 1 << 6;
    const ALL: u16 = 0x7F;

    /// No properties set (non-connectable, non-scannable extended advertising)
    pub const fn new() -> Self {
        Self(0)
    }

    /// Legacy `ADV_IND`: connectable and scannable undirected
    pub const fn adv_ind() -> Self {
        Self(Self::LEGACY | Self::CONNECTABLE | Self::SCANNABLE)
    }

    /// Legacy `ADV_NONCONN_IND`
    pub const fn adv_nonconn_ind() -> Self {
        Self(Self::LEGACY)
    }

    /// Create from the raw HCI field, dropping reserved bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL)
    }

    /// Raw HCI field value
    pub const fn bits(&self) -> u16 {
        self.0
    }

    const fn with(self, flag: u16, enable: bool) -> Self {
        if enable {
            Self(self.0 | flag)
        } else {
            Self(self.0 & !flag)
        }
    }

    pub const fn with_connectable(self, enable: bool) -> Self {
        self.with(Self::CONNECTABLE, enable)
    }

    pub const fn with_scannable(self, enable: bool) -> Self {
        self.with(Self::SCANNABLE, enable)
    }

    pub const fn with_directed(self, enable: bool) -> Self {
        self.with(Self::DIRECTED, enable)
    }

    pub const fn with_high_duty_cycle(self, enable: bool) -> Self {
        self.with(Self::HIGH_DUTY_CYCLE, enable)
    }

    pub const fn with_legacy(self, enable: bool) -> Self {
        self.with(Self::LEGACY, enable)
    }

    pub const fn with_omit_advertiser_address(self, enable: bool) -> Self {
        self.with(Self::OMIT_ADVERTISER_ADDRESS, enable)
    }

    pub const fn with_include_tx_power(self, enable: bool) -> Self {
        self.with(Self::INCLUDE_TX_POWER, enable)
    }

    pub const fn is_connectable(&self) -> bool {
        self.0 & Self::CONNECTABLE != 0
    }

    pub const fn is_scannable(&self) -> bool {
        self.0 & Self::SCANNABLE != 0
    }

    pub const fn is_directed(&self) -> bool {
        self.0 & Self::DIRECTED != 0
    }

    pub const fn is_high_duty_cycle(&self) -> bool {
        self.0 & Self::HIGH_DUTY_CYCLE != 0
    }

    pub const fn is_legacy(&self) -> bool {
        self.0 & Self::LEGACY != 0
    }

    pub const fn omits_advertiser_address(&self) -> bool {
        self.0 & Self::OMIT_ADVERTISER_ADDRESS != 0
    }

    pub const fn includes_tx_power(&self) -> bool {
        self.0 & Self::INCLUDE_TX_POWER != 0
    }

    /// Check the combination against the rules of the Core specification
    ///
    /// Legacy advertising only allows the five legacy PDU shapes. Extended
    /// advertising cannot be both connectable and scannable, high duty cycle
    /// requires connectable directed advertising, and only
    /// non-connectable non-scannable events may omit the advertiser address.
    pub const fn is_valid(&self) -> bool {
        if self.is_legacy() {
            let shape = self.0
                & (Self::CONNECTABLE | Self::SCANNABLE | Self::DIRECTED | Self::HIGH_DUTY_CYCLE);
            let known_pdu = matches!(
                shape,
                // ADV_IND
                0b0011
                // ADV_DIRECT_IND (low / high duty cycle)
                | 0b0101
                | 0b1101
                // ADV_SCAN_IND
                | 0b0010
                // ADV_NONCONN_IND
                | 0b0000
            );
            return known_pdu
                && !self.omits_advertiser_address()
                && !self.includes_tx_power();
        }

        if self.is_connectable() && self.is_scannable() {
            return false;
        }
        if self.is_high_duty_cycle() && !(self.is_connectable() && self.is_directed()) {
            return false;
        }
        if self.omits_advertiser_address() && (self.is_connectable() || self.is_scannable()) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hci_values() {
        assert_eq!(PeerAddressType::RANDOM.value(), 0x01);
        assert_eq!(PrivacyMode::DEVICE.value(), 0x01);
        assert_eq!(
            OwnAddressType::RESOLVABLE_PRIVATE_ADDRESS_RANDOM_FALLBACK.value(),
            0x03
        );
    }

    #[test]
    fn test_own_address_type_ll_privacy() {
        assert!(OwnAddressType::RESOLVABLE_PRIVATE_ADDRESS_PUBLIC_FALLBACK.uses_ll_privacy());
        assert!(!OwnAddressType::RANDOM.uses_ll_privacy());
    }

    #[test]
    fn test_legacy_pdus_valid() {
        assert!(AdvertisingEventProperties::adv_ind().is_valid());
        assert!(AdvertisingEventProperties::adv_nonconn_ind().is_valid());
        let direct_high = AdvertisingEventProperties::new()
            .with_legacy(true)
            .with_connectable(true)
            .with_directed(true)
            .with_high_duty_cycle(true);
        assert!(direct_high.is_valid());
    }

    #[test]
    fn test_legacy_rejects_anonymous() {
        let props = AdvertisingEventProperties::adv_nonconn_ind().with_omit_advertiser_address(true);
        assert!(!props.is_valid());
    }

    #[test]
    fn test_extended_rules() {
        let both = AdvertisingEventProperties::new()
            .with_connectable(true)
            .with_scannable(true);
        assert!(!both.is_valid());

        let anonymous = AdvertisingEventProperties::new().with_omit_advertiser_address(true);
        assert!(anonymous.is_valid());

        let high_duty_undirected = AdvertisingEventProperties::new()
            .with_connectable(true)
            .with_high_duty_cycle(true);
        assert!(!high_duty_undirected.is_valid());
    }

    #[test]
    fn test_from_bits_masks_reserved() {
        assert_eq!(AdvertisingEventProperties::from_bits(0xFF13).bits(), 0x13);
    }
}
