//! HCI status codes (Core v5.x Vol 1, Part F)
//!
//! Only the codes the privacy command set can return are named; anything
//! else is carried through as a reserved raw value.

use crate::safe_enum::safe_enum;

safe_enum! {
    /// Status returned by the controller in Command Complete / Command Status
    pub enum HciErrorCode: u8 as HciErrorCodeKind {
        SUCCESS = 0x00,
        UNKNOWN_HCI_COMMAND = 0x01,
        UNKNOWN_CONNECTION_IDENTIFIER = 0x02,
        HARDWARE_FAILURE = 0x03,
        PAGE_TIMEOUT = 0x04,
        AUTHENTICATION_FAILURE = 0x05,
        PIN_OR_KEY_MISSING = 0x06,
        MEMORY_CAPACITY_EXCEEDED = 0x07,
        CONNECTION_TIMEOUT = 0x08,
        CONNECTION_LIMIT_EXCEEDED = 0x09,
        COMMAND_DISALLOWED = 0x0C,
        CONNECTION_REJECTED_LIMITED_RESOURCES = 0x0D,
        UNSUPPORTED_FEATURE_OR_PARAMETER_VALUE = 0x11,
        INVALID_HCI_COMMAND_PARAMETERS = 0x12,
        REMOTE_USER_TERMINATED_CONNECTION = 0x13,
        CONNECTION_TERMINATED_BY_LOCAL_HOST = 0x16,
        UNSPECIFIED_ERROR = 0x1F,
        CONTROLLER_BUSY = 0x3A,
    }
}

impl HciErrorCode {
    /// Check for `SUCCESS`
    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert!(HciErrorCode::SUCCESS.is_success());
        assert!(!HciErrorCode::COMMAND_DISALLOWED.is_success());
    }

    #[test]
    fn test_reserved_value_debug() {
        assert_eq!(
            format!("{:?}", HciErrorCode::MEMORY_CAPACITY_EXCEEDED),
            "HciErrorCode::MEMORY_CAPACITY_EXCEEDED"
        );
        assert_eq!(format!("{:?}", HciErrorCode::from_raw(0x77)), "HciErrorCode(119)");
    }
}
