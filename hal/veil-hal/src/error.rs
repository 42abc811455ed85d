//! Request rejection

use core::fmt;

/// Why a privacy request was not accepted
///
/// Only the kind is carried. Failures after acceptance are reported through
/// the completion payload instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrivacyError {
    /// Called before `initialize()` or after `terminate()`
    NotInitialized,
    /// A request of the same kind is still outstanding
    Busy,
    /// The link layer has no LL privacy support
    Unsupported,
    /// Parameter rejected before submission
    InvalidParameter,
    /// The resolving list is at capacity
    ResolvingListFull,
    /// No resolving list entry for this peer
    UnknownEntry,
    /// The peer is already in the resolving list
    DuplicateEntry,
    /// Resolving list changes are disallowed while address resolution is
    /// enabled and advertising, scanning or initiating is active
    RadioActive,
    /// The link layer refused the command
    LinkLayer,
    /// The random number generator failed
    RandomUnavailable,
}

impl fmt::Display for PrivacyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivacyError::NotInitialized => write!(f, "controller not initialized"),
            PrivacyError::Busy => write!(f, "request of the same kind outstanding"),
            PrivacyError::Unsupported => write!(f, "link layer privacy not supported"),
            PrivacyError::InvalidParameter => write!(f, "invalid parameter"),
            PrivacyError::ResolvingListFull => write!(f, "resolving list full"),
            PrivacyError::UnknownEntry => write!(f, "peer not in resolving list"),
            PrivacyError::DuplicateEntry => write!(f, "peer already in resolving list"),
            PrivacyError::RadioActive => write!(f, "radio active with address resolution enabled"),
            PrivacyError::LinkLayer => write!(f, "link layer rejected the command"),
            PrivacyError::RandomUnavailable => write!(f, "no randomness available"),
        }
    }
}

impl core::error::Error for PrivacyError {}
