//! Strongly typed enumerations
//!
//! A [`SafeEnum`] is a raw layout value tagged with a zero-sized kind
//! marker. Two enumerations sharing a layout (say, two `u8` code spaces from
//! the HCI specification) can never be compared or mixed because their
//! kinds differ:
//!
//! ```compile_fail
//! use veil_core::{PeerAddressType, PrivacyMode};
//!
//! let _ = PeerAddressType::PUBLIC == PrivacyMode::NETWORK;
//! ```
//!
//! Values of the same kind compare and order like their raw layout:
//!
//! ```
//! use veil_core::PrivacyMode;
//!
//! assert!(PrivacyMode::NETWORK < PrivacyMode::DEVICE);
//! assert_eq!(PrivacyMode::DEVICE.value(), 0x01);
//! ```

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Names a [`SafeEnum`] kind and its known values
pub trait EnumKind<L> {
    /// Name of the enumeration type
    const TYPE_NAME: &'static str;

    /// Name of the constant with the given raw value, if any
    fn variant_name(value: L) -> Option<&'static str>;
}

/// Raw value of layout `L` tagged with enumeration kind `K`
pub struct SafeEnum<K, L = u8> {
    value: L,
    _kind: PhantomData<fn() -> K>,
}

impl<K, L> SafeEnum<K, L> {
    /// Wrap a raw value
    ///
    /// Values outside the named constants are allowed; they are reserved
    /// codes as far as this crate is concerned.
    pub const fn from_raw(value: L) -> Self {
        Self {
            value,
            _kind: PhantomData,
        }
    }
}

impl<K, L: Copy> SafeEnum<K, L> {
    /// Raw stored value
    pub const fn value(&self) -> L {
        self.value
    }
}

impl<K: EnumKind<L>, L: Copy> SafeEnum<K, L> {
    /// Name of the matching constant, or `None` for a reserved value
    pub fn name(&self) -> Option<&'static str> {
        K::variant_name(self.value)
    }
}

impl<K, L: Copy> Clone for SafeEnum<K, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, L: Copy> Copy for SafeEnum<K, L> {}

impl<K, L: PartialEq> PartialEq for SafeEnum<K, L> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K, L: Eq> Eq for SafeEnum<K, L> {}

impl<K, L: PartialOrd> PartialOrd for SafeEnum<K, L> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<K, L: Ord> Ord for SafeEnum<K, L> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<K, L: Hash> Hash for SafeEnum<K, L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K: EnumKind<L>, L: Copy + fmt::Debug> fmt::Debug for SafeEnum<K, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}::{}", K::TYPE_NAME, name),
            None => write!(f, "{}({:?})", K::TYPE_NAME, self.value),
        }
    }
}

#[cfg(feature = "defmt")]
impl<K: EnumKind<L>, L: Copy + defmt::Format> defmt::Format for SafeEnum<K, L> {
    fn format(&self, f: defmt::Formatter) {
        match self.name() {
            Some(name) => defmt::write!(f, "{=str}::{=str}", K::TYPE_NAME, name),
            None => defmt::write!(f, "{=str}({})", K::TYPE_NAME, self.value),
        }
    }
}

#[cfg(feature = "serde")]
impl<K, L: serde::Serialize> serde::Serialize for SafeEnum<K, L> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, L: serde::Deserialize<'de>> serde::Deserialize<'de> for SafeEnum<K, L> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        L::deserialize(deserializer).map(Self::from_raw)
    }
}

/// Declare a [`SafeEnum`] kind, its type alias and its named constants
macro_rules! safe_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $layout:ty as $kind:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:expr,
            )+
        }
    ) => {
        #[doc = concat!("Kind marker for [`", stringify!($name), "`]")]
        $vis enum $kind {}

        $(#[$meta])*
        $vis type $name = $crate::safe_enum::SafeEnum<$kind, $layout>;

        impl $crate::safe_enum::EnumKind<$layout> for $kind {
            const TYPE_NAME: &'static str = stringify!($name);

            fn variant_name(value: $layout) -> Option<&'static str> {
                $(
                    if value == $value {
                        return Some(stringify!($variant));
                    }
                )+
                None
            }
        }

        impl $crate::safe_enum::SafeEnum<$kind, $layout> {
            $(
                $(#[$vmeta])*
                pub const $variant: Self = Self::from_raw($value);
            )+
        }
    };
}

pub(crate) use safe_enum;

#[cfg(test)]
mod tests {
    use super::*;

    safe_enum! {
        /// Test enumeration
        pub enum Color: u8 as ColorKind {
            RED = 1,
            GREEN = 2,
        }
    }

    #[test]
    fn test_named_constants() {
        assert_eq!(Color::RED.value(), 1);
        assert_eq!(Color::GREEN.name(), Some("GREEN"));
        assert_eq!(Color::from_raw(7).name(), None);
    }

    #[test]
    fn test_same_kind_ordering() {
        assert!(Color::RED < Color::GREEN);
        assert!(Color::GREEN >= Color::RED);
        assert_ne!(Color::RED, Color::GREEN);
        assert_eq!(Color::from_raw(2), Color::GREEN);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", Color::RED), "Color::RED");
        assert_eq!(format!("{:?}", Color::from_raw(9)), "Color(9)");
    }
}
