//! HCI commands issued by the private address controller

use heapless::Vec;
use veil_core::crypto::BLOCK_LEN;
use veil_core::{Address, Irk, PeerAddressType, PrivacyMode, ResolvableAddressTimeout};

use crate::opcode;
use crate::packet::{
    PacketError, COMMAND_HEADER_SIZE, MAX_COMMAND_PACKET_SIZE, PACKET_TYPE_COMMAND,
};

/// Commands of the LE privacy command set
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HciCommand {
    /// AES-128 of `plaintext` under `key`, both little-endian
    LeEncrypt {
        key: [u8; BLOCK_LEN],
        plaintext: [u8; BLOCK_LEN],
    },
    LeAddDeviceToResolvingList {
        peer_address_type: PeerAddressType,
        peer_identity_address: Address,
        peer_irk: Irk,
        local_irk: Irk,
    },
    LeRemoveDeviceFromResolvingList {
        peer_address_type: PeerAddressType,
        peer_identity_address: Address,
    },
    LeClearResolvingList,
    LeReadResolvingListSize,
    LeSetAddressResolutionEnable {
        enable: bool,
    },
    LeSetResolvablePrivateAddressTimeout {
        timeout: ResolvableAddressTimeout,
    },
    LeSetPrivacyMode {
        peer_address_type: PeerAddressType,
        peer_identity_address: Address,
        privacy_mode: PrivacyMode,
    },
}

impl HciCommand {
    /// 16-bit opcode: `(OGF << 10) | OCF`
    pub const fn opcode(&self) -> u16 {
        match self {
            HciCommand::LeEncrypt { .. } => opcode::LE_ENCRYPT,
            HciCommand::LeAddDeviceToResolvingList { .. } => {
                opcode::LE_ADD_DEVICE_TO_RESOLVING_LIST
            }
            HciCommand::LeRemoveDeviceFromResolvingList { .. } => {
                opcode::LE_REMOVE_DEVICE_FROM_RESOLVING_LIST
            }
            HciCommand::LeClearResolvingList => opcode::LE_CLEAR_RESOLVING_LIST,
            HciCommand::LeReadResolvingListSize => opcode::LE_READ_RESOLVING_LIST_SIZE,
            HciCommand::LeSetAddressResolutionEnable { .. } => {
                opcode::LE_SET_ADDRESS_RESOLUTION_ENABLE
            }
            HciCommand::LeSetResolvablePrivateAddressTimeout { .. } => {
                opcode::LE_SET_RESOLVABLE_PRIVATE_ADDRESS_TIMEOUT
            }
            HciCommand::LeSetPrivacyMode { .. } => opcode::LE_SET_PRIVACY_MODE,
        }
    }

    /// Parameter block length in bytes
    pub const fn params_len(&self) -> usize {
        match self {
            HciCommand::LeEncrypt { .. } => 2 * BLOCK_LEN,
            HciCommand::LeClearResolvingList | HciCommand::LeReadResolvingListSize => 0,
            HciCommand::LeAddDeviceToResolvingList { .. } => 1 + 6 + 16 + 16,
            HciCommand::LeRemoveDeviceFromResolvingList { .. } => 1 + 6,
            HciCommand::LeSetAddressResolutionEnable { .. } => 1,
            HciCommand::LeSetResolvablePrivateAddressTimeout { .. } => 2,
            HciCommand::LeSetPrivacyMode { .. } => 1 + 6 + 1,
        }
    }

    /// Write the parameter block into `buffer`
    fn write_params(&self, buffer: &mut [u8]) {
        match self {
            HciCommand::LeEncrypt { key, plaintext } => {
                buffer[..BLOCK_LEN].copy_from_slice(key);
                buffer[BLOCK_LEN..2 * BLOCK_LEN].copy_from_slice(plaintext);
            }
            HciCommand::LeClearResolvingList | HciCommand::LeReadResolvingListSize => {}
            HciCommand::LeAddDeviceToResolvingList {
                peer_address_type,
                peer_identity_address,
                peer_irk,
                local_irk,
            } => {
                buffer[0] = peer_address_type.value();
                buffer[1..7].copy_from_slice(peer_identity_address.as_bytes());
                buffer[7..23].copy_from_slice(peer_irk.as_bytes());
                buffer[23..39].copy_from_slice(local_irk.as_bytes());
            }
            HciCommand::LeRemoveDeviceFromResolvingList {
                peer_address_type,
                peer_identity_address,
            } => {
                buffer[0] = peer_address_type.value();
                buffer[1..7].copy_from_slice(peer_identity_address.as_bytes());
            }
            HciCommand::LeSetAddressResolutionEnable { enable } => {
                buffer[0] = u8::from(*enable);
            }
            HciCommand::LeSetResolvablePrivateAddressTimeout { timeout } => {
                buffer[..2].copy_from_slice(&timeout.value().to_le_bytes());
            }
            HciCommand::LeSetPrivacyMode {
                peer_address_type,
                peer_identity_address,
                privacy_mode,
            } => {
                buffer[0] = peer_address_type.value();
                buffer[1..7].copy_from_slice(peer_identity_address.as_bytes());
                buffer[7] = privacy_mode.value();
            }
        }
    }

    /// Encode this command as an H4 packet into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PacketError> {
        let params_len = self.params_len();
        let packet_len = COMMAND_HEADER_SIZE + params_len;
        if buffer.len() < packet_len {
            return Err(PacketError::BufferTooSmall);
        }

        let [opcode_lo, opcode_hi] = self.opcode().to_le_bytes();
        buffer[0] = PACKET_TYPE_COMMAND;
        buffer[1] = opcode_lo;
        buffer[2] = opcode_hi;
        buffer[3] = params_len as u8;
        self.write_params(&mut buffer[COMMAND_HEADER_SIZE..packet_len]);

        Ok(packet_len)
    }

    /// Encode this command into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_COMMAND_PACKET_SIZE>, PacketError> {
        let mut buffer = [0u8; MAX_COMMAND_PACKET_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| PacketError::BufferTooSmall)?;
        Ok(vec)
    }
}
