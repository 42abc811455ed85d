//! HCI events carrying command completions
//!
//! Only the two events that close a command are decoded. Anything else is
//! surfaced as [`HciEvent::Other`] so a transport can skip it without
//! losing sync.

use heapless::Vec;
use veil_core::crypto::BLOCK_LEN;
use veil_core::HciErrorCode;

use crate::opcode;
use crate::packet::{
    PacketError, EVENT_HEADER_SIZE, MAX_RETURN_PARAMS_SIZE, PACKET_TYPE_EVENT,
};

/// Command Complete event code
pub const EVENT_COMMAND_COMPLETE: u8 = 0x0E;

/// Command Status event code
pub const EVENT_COMMAND_STATUS: u8 = 0x0F;

/// Decoded HCI events
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HciEvent {
    /// A previously issued command completed
    CommandComplete {
        num_hci_command_packets: u8,
        opcode: u16,
        status: HciErrorCode,
        /// Return parameters following the status byte
        return_parameters: Vec<u8, MAX_RETURN_PARAMS_SIZE>,
    },
    /// A previously issued command was accepted or rejected
    CommandStatus {
        status: HciErrorCode,
        num_hci_command_packets: u8,
        opcode: u16,
    },
    /// Any other event; only the code is kept
    Other { event_code: u8 },
}

impl HciEvent {
    /// Build a Command Complete event
    pub fn command_complete(
        opcode: u16,
        status: HciErrorCode,
        return_parameters: &[u8],
    ) -> Result<Self, PacketError> {
        let return_parameters =
            Vec::from_slice(return_parameters).map_err(|_| PacketError::ParamsTooLarge)?;
        Ok(HciEvent::CommandComplete {
            num_hci_command_packets: 1,
            opcode,
            status,
            return_parameters,
        })
    }

    /// Build a Command Status event
    pub fn command_status(opcode: u16, status: HciErrorCode) -> Self {
        HciEvent::CommandStatus {
            status,
            num_hci_command_packets: 1,
            opcode,
        }
    }

    /// Opcode of the command this event closes
    pub fn opcode(&self) -> Option<u16> {
        match self {
            HciEvent::CommandComplete { opcode, .. } | HciEvent::CommandStatus { opcode, .. } => {
                Some(*opcode)
            }
            HciEvent::Other { .. } => None,
        }
    }

    /// Status of the command this event closes
    pub fn status(&self) -> Option<HciErrorCode> {
        match self {
            HciEvent::CommandComplete { status, .. } | HciEvent::CommandStatus { status, .. } => {
                Some(*status)
            }
            HciEvent::Other { .. } => None,
        }
    }

    /// Check whether this event finishes its command
    ///
    /// A successful Command Status only acknowledges the command; a failing
    /// one means no Command Complete will follow.
    pub fn is_final(&self) -> bool {
        match self {
            HciEvent::CommandComplete { .. } => true,
            HciEvent::CommandStatus { status, .. } => !status.is_success(),
            HciEvent::Other { .. } => false,
        }
    }

    fn return_parameters(&self, expected_opcode: u16) -> Option<&[u8]> {
        match self {
            HciEvent::CommandComplete {
                opcode,
                status,
                return_parameters,
                ..
            } if *opcode == expected_opcode && status.is_success() => {
                Some(return_parameters.as_slice())
            }
            _ => None,
        }
    }

    /// Encrypted block of a successful LE Encrypt completion
    pub fn encrypted_data(&self) -> Option<[u8; BLOCK_LEN]> {
        self.return_parameters(opcode::LE_ENCRYPT)?
            .try_into()
            .ok()
    }

    /// Capacity from a successful LE Read Resolving List Size completion
    pub fn resolving_list_size(&self) -> Option<u8> {
        match self.return_parameters(opcode::LE_READ_RESOLVING_LIST_SIZE)? {
            [size] => Some(*size),
            _ => None,
        }
    }

    /// Parse a complete H4 event packet
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.is_empty() {
            return Err(PacketError::Incomplete);
        }
        if bytes[0] != PACKET_TYPE_EVENT {
            return Err(PacketError::UnknownPacketType(bytes[0]));
        }
        if bytes.len() < EVENT_HEADER_SIZE {
            return Err(PacketError::Incomplete);
        }

        let event_code = bytes[1];
        let params_len = bytes[2] as usize;
        let params = bytes
            .get(EVENT_HEADER_SIZE..EVENT_HEADER_SIZE + params_len)
            .ok_or(PacketError::Incomplete)?;

        Self::from_params(event_code, params)
    }

    /// Decode an event from its code and parameter block
    pub fn from_params(event_code: u8, params: &[u8]) -> Result<Self, PacketError> {
        match event_code {
            EVENT_COMMAND_COMPLETE => {
                // num_packets, opcode, status, return parameters
                if params.len() < 4 {
                    return Err(PacketError::InvalidLength);
                }
                let kept = params.len().min(4 + MAX_RETURN_PARAMS_SIZE);
                let mut return_parameters = Vec::new();
                // kept bytes fit by construction
                let _ = return_parameters.extend_from_slice(&params[4..kept]);
                Ok(HciEvent::CommandComplete {
                    num_hci_command_packets: params[0],
                    opcode: u16::from_le_bytes([params[1], params[2]]),
                    status: HciErrorCode::from_raw(params[3]),
                    return_parameters,
                })
            }
            EVENT_COMMAND_STATUS => {
                // status, num_packets, opcode
                if params.len() != 4 {
                    return Err(PacketError::InvalidLength);
                }
                Ok(HciEvent::CommandStatus {
                    status: HciErrorCode::from_raw(params[0]),
                    num_hci_command_packets: params[1],
                    opcode: u16::from_le_bytes([params[2], params[3]]),
                })
            }
            event_code => Ok(HciEvent::Other { event_code }),
        }
    }

    /// Encode this event as an H4 packet into a byte buffer
    ///
    /// Returns the number of bytes written. [`HciEvent::Other`] has no
    /// parameters to encode and is written with an empty block.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PacketError> {
        let (event_code, params_len) = match self {
            HciEvent::CommandComplete {
                return_parameters, ..
            } => (EVENT_COMMAND_COMPLETE, 4 + return_parameters.len()),
            HciEvent::CommandStatus { .. } => (EVENT_COMMAND_STATUS, 4),
            HciEvent::Other { event_code } => (*event_code, 0),
        };
        let packet_len = EVENT_HEADER_SIZE + params_len;
        if buffer.len() < packet_len {
            return Err(PacketError::BufferTooSmall);
        }

        buffer[0] = PACKET_TYPE_EVENT;
        buffer[1] = event_code;
        buffer[2] = params_len as u8;
        let params = &mut buffer[EVENT_HEADER_SIZE..packet_len];
        match self {
            HciEvent::CommandComplete {
                num_hci_command_packets,
                opcode,
                status,
                return_parameters,
            } => {
                params[0] = *num_hci_command_packets;
                params[1..3].copy_from_slice(&opcode.to_le_bytes());
                params[3] = status.value();
                params[4..].copy_from_slice(return_parameters);
            }
            HciEvent::CommandStatus {
                status,
                num_hci_command_packets,
                opcode,
            } => {
                params[0] = status.value();
                params[1] = *num_hci_command_packets;
                params[2..4].copy_from_slice(&opcode.to_le_bytes());
            }
            HciEvent::Other { .. } => {}
        }

        Ok(packet_len)
    }
}

/// State machine for parsing H4 event packets from a byte stream
#[derive(Debug, Clone)]
pub struct EventParser {
    state: ParseState,
    buffer: Vec<u8, 255>,
    expected_length: u8,
    event_code: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the event packet type byte
    WaitingForType,
    /// Got the type, waiting for the event code
    WaitingForCode,
    /// Got the code, waiting for the parameter length
    WaitingForLength,
    /// Reading parameter bytes
    ReadingParams,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParser {
    /// Create a new event parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForType,
            buffer: Vec::new(),
            expected_length: 0,
            event_code: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForType;
        self.buffer.clear();
        self.expected_length = 0;
        self.event_code = 0;
    }

    fn finish(&mut self) -> Result<Option<HciEvent>, PacketError> {
        let event = HciEvent::from_params(self.event_code, &self.buffer);
        self.reset();
        event.map(Some)
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(event))` when a complete packet is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` when the packet is
    /// malformed. Bytes before an event packet type are skipped.
    pub fn feed(&mut self, byte: u8) -> Result<Option<HciEvent>, PacketError> {
        match self.state {
            ParseState::WaitingForType => {
                if byte == PACKET_TYPE_EVENT {
                    self.state = ParseState::WaitingForCode;
                }
                Ok(None)
            }
            ParseState::WaitingForCode => {
                self.event_code = byte;
                self.state = ParseState::WaitingForLength;
                Ok(None)
            }
            ParseState::WaitingForLength => {
                self.expected_length = byte;
                if byte == 0 {
                    return self.finish();
                }
                self.buffer.clear();
                self.state = ParseState::ReadingParams;
                Ok(None)
            }
            ParseState::ReadingParams => {
                // capacity covers the largest u8 length
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_length as usize {
                    return self.finish();
                }
                Ok(None)
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete event found, if any.
    /// Remaining bytes after a complete event are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<HciEvent>, PacketError> {
        for &byte in bytes {
            if let Some(event) = self.feed(byte)? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}
