//! Device addresses and identity resolving keys
//!
//! Both types are stored in HCI byte order: least significant octet first.
//! Use the `from_msb` constructors when copying values written the way the
//! Core specification and most tools print them.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Address length in bytes
pub const ADDRESS_LEN: usize = 6;

/// Identity resolving key length in bytes
pub const IRK_LEN: usize = 16;

/// 48-bit device address (public, random static, resolvable or
/// non-resolvable private)
///
/// The all-zero value is [`Address::INVALID`] and doubles as the failure
/// marker for address generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address([u8; ADDRESS_LEN]);

/// Sub-type of a random device address, from its two most significant bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    /// `0b11`: random static address
    Static,
    /// `0b01`: resolvable private address
    ResolvablePrivate,
    /// `0b00`: non-resolvable private address
    NonResolvablePrivate,
    /// `0b10`: reserved for future use
    Reserved,
}

impl Address {
    /// All-zero address, never valid on air
    pub const INVALID: Self = Self([0; ADDRESS_LEN]);

    /// Create from bytes in HCI order (least significant octet first)
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from bytes in display order (most significant octet first)
    pub const fn from_msb(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self([bytes[5], bytes[4], bytes[3], bytes[2], bytes[1], bytes[0]])
    }

    /// Bytes in HCI order
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Check for the all-zero sentinel
    pub fn is_invalid(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }

    /// Classify as a random address
    ///
    /// Only meaningful when the address is known to be random; a public
    /// address carries no sub-type in its bits.
    pub fn kind(&self) -> AddressKind {
        match self.0[5] >> 6 {
            0b11 => AddressKind::Static,
            0b01 => AddressKind::ResolvablePrivate,
            0b00 => AddressKind::NonResolvablePrivate,
            _ => AddressKind::Reserved,
        }
    }

    /// Check whether this is a resolvable private address
    pub fn is_resolvable(&self) -> bool {
        self.kind() == AddressKind::ResolvablePrivate
    }

    /// `hash` part of a resolvable private address (least significant 24 bits)
    pub fn rpa_hash(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// `prand` part of a resolvable private address (most significant 24 bits)
    pub fn rpa_prand(&self) -> [u8; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// Assemble a resolvable private address from `hash` and `prand`
    pub const fn from_rpa_parts(hash: [u8; 3], prand: [u8; 3]) -> Self {
        Self([hash[0], hash[1], hash[2], prand[0], prand[1], prand[2]])
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Address {
    fn format(&self, f: defmt::Formatter) {
        let b = &self.0;
        defmt::write!(
            f,
            "{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}:{=u8:02X}",
            b[5],
            b[4],
            b[3],
            b[2],
            b[1],
            b[0]
        )
    }
}

/// 128-bit identity resolving key
///
/// Key material: `Debug` and `defmt::Format` never print the bytes.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Irk([u8; IRK_LEN]);

impl Irk {
    /// Create from bytes in HCI order (least significant octet first)
    pub const fn new(bytes: [u8; IRK_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from bytes in most significant octet first order
    pub const fn from_msb(bytes: [u8; IRK_LEN]) -> Self {
        let mut out = [0u8; IRK_LEN];
        let mut i = 0;
        while i < IRK_LEN {
            out[i] = bytes[IRK_LEN - 1 - i];
            i += 1;
        }
        Self(out)
    }

    /// Bytes in HCI order
    pub const fn as_bytes(&self) -> &[u8; IRK_LEN] {
        &self.0
    }

    /// An all-zero IRK means "no key distributed"
    pub fn is_zero(&self) -> bool {
        self.0 == [0; IRK_LEN]
    }
}

impl fmt::Debug for Irk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Irk(..)")
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Irk {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Irk(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_invalid() {
        assert!(Address::default().is_invalid());
        assert_eq!(Address::default(), Address::INVALID);
        assert!(!Address::new([1, 0, 0, 0, 0, 0]).is_invalid());
    }

    #[test]
    fn test_msb_order() {
        let addr = Address::from_msb([0x5B, 0x89, 0x68, 0x1E, 0x4E, 0x19]);
        assert_eq!(addr.as_bytes(), &[0x19, 0x4E, 0x1E, 0x68, 0x89, 0x5B]);
        assert_eq!(format!("{}", addr), "5B:89:68:1E:4E:19");
    }

    #[test]
    fn test_kind_from_top_bits() {
        assert_eq!(Address::new([0, 0, 0, 0, 0, 0xC0]).kind(), AddressKind::Static);
        assert_eq!(
            Address::new([0, 0, 0, 0, 0, 0x40]).kind(),
            AddressKind::ResolvablePrivate
        );
        assert_eq!(
            Address::new([0, 0, 0, 0, 0, 0x3F]).kind(),
            AddressKind::NonResolvablePrivate
        );
        assert_eq!(Address::new([0, 0, 0, 0, 0, 0x80]).kind(), AddressKind::Reserved);
    }

    #[test]
    fn test_rpa_parts() {
        let addr = Address::from_rpa_parts([1, 2, 3], [4, 5, 0x46]);
        assert_eq!(addr.rpa_hash(), [1, 2, 3]);
        assert_eq!(addr.rpa_prand(), [4, 5, 0x46]);
        assert!(addr.is_resolvable());
    }

    #[test]
    fn test_irk_debug_hides_key() {
        let irk = Irk::new([0xAB; IRK_LEN]);
        assert_eq!(format!("{:?}", irk), "Irk(..)");
    }

    #[test]
    fn test_irk_from_msb_reverses() {
        let mut msb = [0u8; IRK_LEN];
        msb[0] = 0xEC;
        msb[15] = 0x9B;
        let irk = Irk::from_msb(msb);
        assert_eq!(irk.as_bytes()[0], 0x9B);
        assert_eq!(irk.as_bytes()[15], 0xEC);
    }
}
