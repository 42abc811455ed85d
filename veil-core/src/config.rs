//! Persisted privacy configuration
//!
//! Applied by the controller on `initialize()`. With the `serde` feature the
//! record can be stored in flash as postcard binary data and validated on
//! load through its magic and version fields.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::duration::ResolvableAddressTimeout;
use crate::gap::PrivacyMode;

/// Magic number to identify a stored privacy configuration
pub const CONFIG_MAGIC: u32 = 0x5645494C; // "VEIL"

/// Current configuration record version
pub const CONFIG_VERSION: u8 = 1;

/// Default RPA rotation period in seconds (15 minutes)
pub const DEFAULT_RPA_TIMEOUT_S: u16 = 900;

/// Upper bound on an encoded [`PrivacyConfig`]
pub const CONFIG_MAX_ENCODED_LEN: usize = 16;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Buffer too small or serializer failure
    Encode,
    /// Stored bytes could not be decoded
    Decode,
    /// Decoded record has the wrong magic or version
    Invalid,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Encode => write!(f, "failed to encode privacy config"),
            ConfigError::Decode => write!(f, "failed to decode privacy config"),
            ConfigError::Invalid => write!(f, "privacy config magic or version mismatch"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Privacy settings applied when the controller is initialized
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrivacyConfig {
    /// Magic number for validation
    pub magic: u32,
    /// Record format version
    pub version: u8,
    /// Rotation period for controller-generated RPAs
    pub rpa_timeout: ResolvableAddressTimeout,
    /// Enable link-layer address resolution on initialize
    pub enable_address_resolution: bool,
    /// Privacy mode for peers added to the resolving list
    pub default_privacy_mode: PrivacyMode,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivacyConfig {
    /// Default configuration: 15 minute rotation, resolution off, network privacy
    pub fn new() -> Self {
        Self {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            rpa_timeout: ResolvableAddressTimeout::new(DEFAULT_RPA_TIMEOUT_S),
            enable_address_resolution: false,
            default_privacy_mode: PrivacyMode::NETWORK,
        }
    }

    pub fn with_rpa_timeout(mut self, timeout: ResolvableAddressTimeout) -> Self {
        self.rpa_timeout = timeout;
        self
    }

    pub fn with_address_resolution(mut self, enable: bool) -> Self {
        self.enable_address_resolution = enable;
        self
    }

    pub fn with_default_privacy_mode(mut self, mode: PrivacyMode) -> Self {
        self.default_privacy_mode = mode;
        self
    }

    /// Check if the record is valid (magic and version match)
    pub fn is_valid(&self) -> bool {
        self.magic == CONFIG_MAGIC && self.version == CONFIG_VERSION
    }

    /// Serialize into `buf`, returning the used prefix
    #[cfg(feature = "serde")]
    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encode)
    }

    /// Deserialize and validate a stored record
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
        if !config.is_valid() {
            return Err(ConfigError::Invalid);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrivacyConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.rpa_timeout.value(), 900);
        assert!(!config.enable_address_resolution);
        assert_eq!(config.default_privacy_mode, PrivacyMode::NETWORK);
    }

    #[test]
    fn test_builders() {
        let config = PrivacyConfig::new()
            .with_rpa_timeout(ResolvableAddressTimeout::new(60))
            .with_address_resolution(true)
            .with_default_privacy_mode(PrivacyMode::DEVICE);
        assert_eq!(config.rpa_timeout.value(), 60);
        assert!(config.enable_address_resolution);
        assert_eq!(config.default_privacy_mode, PrivacyMode::DEVICE);
    }

    #[test]
    fn test_bad_magic_invalid() {
        let mut config = PrivacyConfig::new();
        config.magic = 0;
        assert!(!config.is_valid());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_storage() {
        let config = PrivacyConfig::new().with_address_resolution(true);
        let mut buf = [0u8; CONFIG_MAX_ENCODED_LEN];
        let used = config.to_slice(&mut buf).unwrap().len();

        let loaded = PrivacyConfig::from_bytes(&buf[..used]).unwrap();
        assert_eq!(loaded, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_rejects_wrong_version() {
        let mut config = PrivacyConfig::new();
        config.version = CONFIG_VERSION + 1;
        let mut buf = [0u8; CONFIG_MAX_ENCODED_LEN];
        let used = config.to_slice(&mut buf).unwrap().len();

        assert_eq!(
            PrivacyConfig::from_bytes(&buf[..used]),
            Err(ConfigError::Invalid)
        );
        assert_eq!(PrivacyConfig::from_bytes(&[]), Err(ConfigError::Decode));
    }
}
