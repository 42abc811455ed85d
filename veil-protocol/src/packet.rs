//! H4 packet framing
//!
//! Packet format:
//! - TYPE (1 byte): 0x01 command, 0x04 event
//! - HEADER: opcode (2 bytes, little-endian) for commands, event code
//!   (1 byte) for events
//! - LENGTH (1 byte): parameter length
//! - PARAMETERS (0-255 bytes)

/// H4 packet type of a command (host to controller)
pub const PACKET_TYPE_COMMAND: u8 = 0x01;

/// H4 packet type of an event (controller to host)
pub const PACKET_TYPE_EVENT: u8 = 0x04;

/// Command packet header: type, opcode, length
pub const COMMAND_HEADER_SIZE: usize = 4;

/// Event packet header: type, event code, length
pub const EVENT_HEADER_SIZE: usize = 3;

/// Largest parameter block in the privacy command set (LE Add Device To Resolving List)
pub const MAX_COMMAND_PARAMS_SIZE: usize = 39;

/// Largest command packet this crate encodes
pub const MAX_COMMAND_PACKET_SIZE: usize = COMMAND_HEADER_SIZE + MAX_COMMAND_PARAMS_SIZE;

/// Largest return parameter block kept from a Command Complete event
///
/// Parsed events carrying more are truncated. No command this crate issues
/// returns that much, so only completions nobody waits for lose bytes.
pub const MAX_RETURN_PARAMS_SIZE: usize = 32;

/// Largest event packet this crate decodes
pub const MAX_EVENT_PACKET_SIZE: usize = EVENT_HEADER_SIZE + 255;

/// Errors that can occur during packet parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Packet is shorter than its header or declared length
    Incomplete,
    /// First byte is not a known H4 packet type
    UnknownPacketType(u8),
    /// Declared parameter length does not match the event layout
    InvalidLength,
    /// Return parameters passed to a constructor exceed [`MAX_RETURN_PARAMS_SIZE`]
    ParamsTooLarge,
}

impl core::fmt::Display for PacketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PacketError::BufferTooSmall => write!(f, "buffer too small"),
            PacketError::Incomplete => write!(f, "incomplete packet"),
            PacketError::UnknownPacketType(t) => write!(f, "unknown packet type 0x{:02X}", t),
            PacketError::InvalidLength => write!(f, "invalid parameter length"),
            PacketError::ParamsTooLarge => write!(f, "return parameters too large"),
        }
    }
}

impl core::error::Error for PacketError {}
