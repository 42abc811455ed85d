//! Private address construction (Core v5.x Vol 3, Part H, 2.2 and Vol 6, Part B, 1.3.2)
//!
//! `e` is the AES-128 security function, `ah` the random address hash.
//! The HCI `LE Encrypt` command takes and returns little-endian blocks; the
//! security functions in the Core specification are written most
//! significant octet first. Both forms are provided so the host-side
//! computation and a controller round trip give identical results.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::address::{Address, Irk, ADDRESS_LEN, IRK_LEN};

/// AES block length in bytes
pub const BLOCK_LEN: usize = 16;

/// Length of the `prand` and `hash` halves of an RPA
pub const RPA_PART_LEN: usize = 3;

const RPA_TAG: u8 = 0b01 << 6;
const TAG_MASK: u8 = 0b11 << 6;

/// Security function `e`: AES-128, key and data most significant octet first
pub fn e(key: &[u8; BLOCK_LEN], plaintext: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
    let cipher = Aes128::new(&GenericArray::from(*key));
    let mut block = GenericArray::from(*plaintext);
    cipher.encrypt_block(&mut block);

    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(block.as_slice());
    out
}

/// `e` with key, plaintext and result in HCI byte order (`LE Encrypt`)
pub fn encrypt_le(key: &[u8; BLOCK_LEN], plaintext: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
    let mut key_msb = *key;
    key_msb.reverse();
    let mut data_msb = *plaintext;
    data_msb.reverse();

    let mut out = e(&key_msb, &data_msb);
    out.reverse();
    out
}

/// `LE Encrypt` plaintext for `ah`: `prand` padded with zeros, little-endian
pub fn prand_block(prand: [u8; RPA_PART_LEN]) -> [u8; BLOCK_LEN] {
    let mut block = [0u8; BLOCK_LEN];
    block[..RPA_PART_LEN].copy_from_slice(&prand);
    block
}

/// Extract the 24-bit `hash` from a little-endian `LE Encrypt` result
pub fn hash_from_block(block: &[u8; BLOCK_LEN]) -> [u8; RPA_PART_LEN] {
    [block[0], block[1], block[2]]
}

/// Random address hash `ah(k, r)`, little-endian in and out
pub fn ah(irk: &Irk, prand: [u8; RPA_PART_LEN]) -> [u8; RPA_PART_LEN] {
    hash_from_block(&encrypt_le(irk.as_bytes(), &prand_block(prand)))
}

/// Build a resolvable private address from an IRK and a tagged `prand`
pub fn make_rpa(irk: &Irk, prand: [u8; RPA_PART_LEN]) -> Address {
    Address::from_rpa_parts(ah(irk, prand), prand)
}

/// Check whether `address` is an RPA generated from `irk`
pub fn resolves(address: &Address, irk: &Irk) -> bool {
    address.is_resolvable() && ah(irk, address.rpa_prand()) == address.rpa_hash()
}

/// Turn 24 random bits into an RPA `prand`
///
/// The two most significant bits are replaced by the `0b01` tag. Returns
/// `None` when the remaining 22 bits are all zeros or all ones, which the
/// Core specification forbids.
pub fn make_prand(random: [u8; RPA_PART_LEN]) -> Option<[u8; RPA_PART_LEN]> {
    let mut prand = random;
    prand[2] = (prand[2] & !TAG_MASK) | RPA_TAG;

    let low = [prand[0], prand[1], prand[2] & !TAG_MASK];
    if low == [0x00, 0x00, 0x00] || low == [0xFF, 0xFF, !TAG_MASK] {
        return None;
    }
    Some(prand)
}

/// Turn 48 random bits into a non-resolvable private address
///
/// The two most significant bits are cleared. Returns `None` when the
/// remaining 46 bits are all zeros or all ones.
pub fn make_nrpa(random: [u8; ADDRESS_LEN]) -> Option<Address> {
    let mut bytes = random;
    bytes[5] &= !TAG_MASK;

    let all_zero = bytes == [0x00; ADDRESS_LEN];
    let all_ones = bytes[..5] == [0xFF; 5] && bytes[5] == !TAG_MASK;
    if all_zero || all_ones {
        return None;
    }
    Some(Address::new(bytes))
}

const _: () = assert!(IRK_LEN == BLOCK_LEN);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressKind;

    fn sample_irk() -> Irk {
        Irk::from_msb([
            0xec, 0x02, 0x34, 0xa3, 0x57, 0xc8, 0xad, 0x05, 0x34, 0x10, 0x10, 0xa6, 0x0a, 0x39,
            0x7d, 0x9b,
        ])
    }

    fn counting_irk() -> Irk {
        Irk::new([
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ])
    }

    #[test]
    fn test_ah_sample_data() {
        // prand 0x708194 -> hash 0x0dfbaa
        let hash = ah(&sample_irk(), [0x94, 0x81, 0x70]);
        assert_eq!(hash, [0xaa, 0xfb, 0x0d]);
    }

    #[test]
    fn test_make_rpa_sample_data() {
        let rpa = make_rpa(&sample_irk(), [0x94, 0x81, 0x70]);
        assert_eq!(rpa, Address::from_msb([0x70, 0x81, 0x94, 0x0d, 0xfb, 0xaa]));
        assert!(resolves(&rpa, &sample_irk()));
    }

    #[test]
    fn test_e_matches_encrypt_le() {
        let key = [0x2b; BLOCK_LEN];
        let mut data = [0u8; BLOCK_LEN];
        data[0] = 0x42;

        let mut key_msb = key;
        key_msb.reverse();
        let mut data_msb = data;
        data_msb.reverse();
        let mut expected = e(&key_msb, &data_msb);
        expected.reverse();

        assert_eq!(encrypt_le(&key, &data), expected);
    }

    #[test]
    fn test_resolves_known_addresses() {
        let irk = counting_irk();
        for msb in [
            [0x5B, 0x89, 0x68, 0x1E, 0x4E, 0x19],
            [0x79, 0xCB, 0x92, 0x70, 0xBE, 0xB3],
            [0x5D, 0xEC, 0xDA, 0x8C, 0x33, 0xAE],
        ] {
            assert!(resolves(&Address::from_msb(msb), &irk), "{:02X?}", msb);
        }
    }

    #[test]
    fn test_resolves_rejects_wrong_prand() {
        let irk = counting_irk();
        // 0x60 has the resolvable tag but a different prand
        let addr = Address::from_msb([0x60, 0x89, 0x68, 0x1E, 0x4E, 0x19]);
        assert!(!resolves(&addr, &irk));
    }

    #[test]
    fn test_resolves_requires_rpa_tag() {
        let irk = sample_irk();
        let rpa = make_rpa(&irk, [0x94, 0x81, 0x70]);
        let mut bytes = *rpa.as_bytes();
        bytes[5] |= 0xC0;
        assert!(!resolves(&Address::new(bytes), &irk));
    }

    #[test]
    fn test_make_prand_sets_tag() {
        let prand = make_prand([0x12, 0x34, 0xFF]).unwrap();
        assert_eq!(prand, [0x12, 0x34, 0x7F]);
        let addr = Address::from_rpa_parts([0; 3], prand);
        assert_eq!(addr.kind(), AddressKind::ResolvablePrivate);
    }

    #[test]
    fn test_make_prand_rejects_degenerate() {
        assert_eq!(make_prand([0x00, 0x00, 0xC0]), None);
        assert_eq!(make_prand([0xFF, 0xFF, 0xFF]), None);
        assert!(make_prand([0x01, 0x00, 0x00]).is_some());
    }

    #[test]
    fn test_make_nrpa() {
        let addr = make_nrpa([1, 2, 3, 4, 5, 0xFF]).unwrap();
        assert_eq!(addr.as_bytes(), &[1, 2, 3, 4, 5, 0x3F]);
        assert_eq!(addr.kind(), AddressKind::NonResolvablePrivate);

        assert_eq!(make_nrpa([0, 0, 0, 0, 0, 0xC0]), None);
        assert_eq!(make_nrpa([0xFF; ADDRESS_LEN]), None);
    }
}
