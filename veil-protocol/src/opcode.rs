//! HCI opcodes of the LE privacy command set
//!
//! An opcode packs the command group (OGF) into the upper 6 bits and the
//! command (OCF) into the lower 10 bits. Every command here is in the LE
//! controller group, OGF 0x08.

/// LE controller command group
pub const OGF_LE: u16 = 0x08;

/// Build an opcode from group and command field
pub const fn opcode(ogf: u16, ocf: u16) -> u16 {
    (ogf << 10) | (ocf & 0x03FF)
}

/// Command group of an opcode
pub const fn ogf(opcode: u16) -> u16 {
    opcode >> 10
}

/// Command field of an opcode
pub const fn ocf(opcode: u16) -> u16 {
    opcode & 0x03FF
}

pub const LE_ENCRYPT: u16 = opcode(OGF_LE, 0x0017);
pub const LE_ADD_DEVICE_TO_RESOLVING_LIST: u16 = opcode(OGF_LE, 0x0027);
pub const LE_REMOVE_DEVICE_FROM_RESOLVING_LIST: u16 = opcode(OGF_LE, 0x0028);
pub const LE_CLEAR_RESOLVING_LIST: u16 = opcode(OGF_LE, 0x0029);
pub const LE_READ_RESOLVING_LIST_SIZE: u16 = opcode(OGF_LE, 0x002A);
pub const LE_SET_ADDRESS_RESOLUTION_ENABLE: u16 = opcode(OGF_LE, 0x002D);
pub const LE_SET_RESOLVABLE_PRIVATE_ADDRESS_TIMEOUT: u16 = opcode(OGF_LE, 0x002E);
pub const LE_SET_PRIVACY_MODE: u16 = opcode(OGF_LE, 0x004E);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_opcodes() {
        assert_eq!(LE_ENCRYPT, 0x2017);
        assert_eq!(LE_ADD_DEVICE_TO_RESOLVING_LIST, 0x2027);
        assert_eq!(LE_SET_RESOLVABLE_PRIVATE_ADDRESS_TIMEOUT, 0x202E);
        assert_eq!(LE_SET_PRIVACY_MODE, 0x204E);
    }

    #[test]
    fn test_split_opcode() {
        assert_eq!(ogf(LE_CLEAR_RESOLVING_LIST), OGF_LE);
        assert_eq!(ocf(LE_CLEAR_RESOLVING_LIST), 0x0029);
    }
}
