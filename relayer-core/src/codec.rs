//! VAA wire format.
//!
//! All integers are big-endian with no padding. The header is
//! `version(1) | guardian_set_index(4) | sig_count(1)`, followed by
//! `sig_count` records of `guardian_index(1) | r(32) | s(32) | v(1)` and the
//! body `timestamp(4) | nonce(4) | emitter_chain(2) | emitter_address(32) |
//! sequence(8) | consistency_level(1) | payload(..)`.
//!
//! Payload classification runs in two stages. The first compares the leading
//! 32 bytes against the token bridge and core module identifiers and decodes
//! the governance action. The second looks at the bytes left after the first
//! stage and matches the attest, transfer and transfer-with-payload shapes by
//! length and type byte. Shape matches are tried in that order and a later
//! match replaces an earlier one.

use crate::error::{RelayError, Result};
use crate::types::{
    Attest, CoreGovernance, Meta, RegisterChain, Signature, Transfer, TransferWithPayload,
    UpgradeContract, Vaa, SIGNATURE_RECORD_LEN,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

/// "TokenBridge", left-padded to 32 bytes.
pub const TOKEN_BRIDGE_MODULE: [u8; 32] = module_id(b"TokenBridge");
/// "Core", left-padded to 32 bytes.
pub const CORE_MODULE: [u8; 32] = module_id(b"Core");

pub const HEADER_LEN: usize = 6;
pub const BODY_HEADER_LEN: usize = 51;

pub const ATTEST_LEN: usize = 100;
pub const TRANSFER_LEN: usize = 133;

const TRANSFER_TYPE: u8 = 1;
const ATTEST_TYPE: u8 = 2;
const TRANSFER_WITH_PAYLOAD_TYPE: u8 = 3;

const fn module_id(name: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let start = 32 - name.len();
    let mut i = 0;
    while i < name.len() {
        out[start + i] = name[i];
        i += 1;
    }
    out
}

pub fn decode_vaa(bytes: &[u8]) -> Result<Vaa> {
    if bytes.len() < HEADER_LEN {
        return Err(RelayError::MalformedVaa(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    let mut cursor = Cursor::new(bytes);

    let version = cursor.read_u8().map_err(truncated)?;
    let guardian_set_index = cursor.read_u32::<BigEndian>().map_err(truncated)?;
    let sig_count = cursor.read_u8().map_err(truncated)? as usize;

    let required = HEADER_LEN + sig_count * SIGNATURE_RECORD_LEN + BODY_HEADER_LEN;
    if bytes.len() < required {
        return Err(RelayError::MalformedVaa(format!(
            "{} signatures need at least {} bytes, got {}",
            sig_count,
            required,
            bytes.len()
        )));
    }

    let mut signatures = Vec::with_capacity(sig_count);
    for _ in 0..sig_count {
        let guardian_index = cursor.read_u8().map_err(truncated)?;
        let mut sig = [0u8; 65];
        cursor.read_exact(&mut sig).map_err(truncated)?;
        signatures.push(Signature::from_bytes(guardian_index, &sig));
    }

    let timestamp = cursor.read_u32::<BigEndian>().map_err(truncated)?;
    let nonce = cursor.read_u32::<BigEndian>().map_err(truncated)?;
    let emitter_chain = cursor.read_u16::<BigEndian>().map_err(truncated)?;
    let emitter_address = read_bytes32(&mut cursor).map_err(truncated)?;
    let sequence = cursor.read_u64::<BigEndian>().map_err(truncated)?;
    let consistency_level = cursor.read_u8().map_err(truncated)?;

    let payload = bytes[cursor.position() as usize..].to_vec();
    let meta = classify_payload(&payload);

    Ok(Vaa {
        version,
        guardian_set_index,
        signatures,
        timestamp,
        nonce,
        emitter_chain,
        emitter_address,
        sequence,
        consistency_level,
        payload,
        meta,
    })
}

pub fn classify_payload(payload: &[u8]) -> Meta {
    let mut cursor = Cursor::new(payload);

    let mut meta = match read_module(&mut cursor) {
        Ok(meta) => meta,
        Err(_) => {
            cursor.set_position(0);
            Meta::Unknown
        }
    };

    if remaining(&cursor) == ATTEST_LEN && peek(&cursor) == Some(ATTEST_TYPE) {
        if let Ok(attest) = read_attest(&mut cursor) {
            meta = Meta::Attest(attest);
        }
    }

    if remaining(&cursor) == TRANSFER_LEN && peek(&cursor) == Some(TRANSFER_TYPE) {
        if let Ok(transfer) = read_transfer(&mut cursor) {
            meta = Meta::Transfer(transfer);
        }
    }

    if remaining(&cursor) >= TRANSFER_LEN && peek(&cursor) == Some(TRANSFER_WITH_PAYLOAD_TYPE) {
        if let Ok(transfer) = read_transfer(&mut cursor) {
            // the fee field is still ahead of the cursor
            let start = cursor.position() as usize + 32;
            let payload = cursor.get_ref()[start..].to_vec();
            meta = Meta::TransferWithPayload(TransferWithPayload { transfer, payload });
        }
    }

    meta
}

fn read_module(cursor: &mut Cursor<&[u8]>) -> io::Result<Meta> {
    let module = read_bytes32(cursor)?;

    if module == TOKEN_BRIDGE_MODULE {
        let action = cursor.read_u8()?;
        match action {
            1 => Ok(Meta::RegisterChain(RegisterChain {
                target_chain: cursor.read_u16::<BigEndian>()?,
                emitter_chain: cursor.read_u16::<BigEndian>()?,
                target_emitter: read_bytes32(cursor)?,
            })),
            2 => Ok(Meta::UpgradeContract(UpgradeContract {
                target_chain: cursor.read_u16::<BigEndian>()?,
                new_contract: read_bytes32(cursor)?,
            })),
            other => Ok(Meta::TokenBridge { action: other }),
        }
    } else if module == CORE_MODULE {
        let action = cursor.read_u8()?;
        let target_chain = cursor.read_u16::<BigEndian>()?;
        // the new index is decoded but left unconsumed for the shape stage
        let position = cursor.position();
        let new_guardian_set_index = cursor.read_u32::<BigEndian>()?;
        cursor.set_position(position);

        Ok(Meta::CoreGovernance(CoreGovernance {
            action,
            target_chain,
            new_guardian_set_index,
        }))
    } else {
        cursor.set_position(0);
        Ok(Meta::Unknown)
    }
}

/// Leaves the cursor on the name field.
fn read_attest(cursor: &mut Cursor<&[u8]>) -> io::Result<Attest> {
    let _type = cursor.read_u8()?;
    let contract = read_bytes32(cursor)?;
    let from_chain = cursor.read_u16::<BigEndian>()?;
    let decimals = cursor.read_u8()?;
    let symbol = read_bytes32(cursor)?;

    let position = cursor.position();
    let name = read_bytes32(cursor)?;
    cursor.set_position(position);

    Ok(Attest {
        contract,
        from_chain,
        decimals,
        symbol,
        name,
    })
}

/// Leaves the cursor on the fee field.
fn read_transfer(cursor: &mut Cursor<&[u8]>) -> io::Result<Transfer> {
    let _type = cursor.read_u8()?;
    let amount = read_bytes32(cursor)?;
    let contract = read_bytes32(cursor)?;
    let from_chain = cursor.read_u16::<BigEndian>()?;
    let to_address = read_bytes32(cursor)?;
    let to_chain = cursor.read_u16::<BigEndian>()?;

    let position = cursor.position();
    let fee = read_bytes32(cursor)?;
    cursor.set_position(position);

    Ok(Transfer {
        amount,
        contract,
        from_chain,
        to_address,
        to_chain,
        fee,
    })
}

fn read_bytes32(cursor: &mut Cursor<&[u8]>) -> io::Result<[u8; 32]> {
    let mut out = [0u8; 32];
    cursor.read_exact(&mut out)?;
    Ok(out)
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor.get_ref().len().saturating_sub(cursor.position() as usize)
}

fn peek(cursor: &Cursor<&[u8]>) -> Option<u8> {
    cursor.get_ref().get(cursor.position() as usize).copied()
}

fn truncated(err: io::Error) -> RelayError {
    RelayError::MalformedVaa(format!("truncated VAA: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attest_payload(name_first_byte: u8) -> Vec<u8> {
        let mut payload = vec![ATTEST_TYPE];
        payload.extend_from_slice(&[0xaa; 32]);
        payload.extend_from_slice(&2u16.to_be_bytes());
        payload.push(18);
        payload.extend_from_slice(&[0x53; 32]);
        let mut name = [0x4e; 32];
        name[0] = name_first_byte;
        payload.extend_from_slice(&name);
        payload
    }

    fn transfer_body(kind: u8, fee: [u8; 32]) -> Vec<u8> {
        let mut payload = vec![kind];
        payload.extend_from_slice(&[0x01; 32]);
        payload.extend_from_slice(&[0x02; 32]);
        payload.extend_from_slice(&5u16.to_be_bytes());
        payload.extend_from_slice(&[0x03; 32]);
        payload.extend_from_slice(&8u16.to_be_bytes());
        payload.extend_from_slice(&fee);
        payload
    }

    #[test]
    fn test_module_identifiers() {
        assert_eq!(
            hex::encode(TOKEN_BRIDGE_MODULE),
            "000000000000000000000000000000000000000000546f6b656e427269646765"
        );
        assert_eq!(
            hex::encode(CORE_MODULE),
            "00000000000000000000000000000000000000000000000000000000436f7265"
        );
    }

    #[test]
    fn test_classify_attest_shape() {
        let meta = classify_payload(&attest_payload(0x4e));
        let Meta::Attest(attest) = meta else {
            panic!("expected attest, got {:?}", meta);
        };
        assert_eq!(attest.from_chain, 2);
        assert_eq!(attest.decimals, 18);
        assert_eq!(attest.symbol, [0x53; 32]);
        assert_eq!(attest.name, [0x4e; 32]);
    }

    #[test]
    fn test_attest_name_starting_with_three_stays_attest() {
        let meta = classify_payload(&attest_payload(TRANSFER_WITH_PAYLOAD_TYPE));
        assert_eq!(meta.name(), "TokenBridge Attest");
    }

    #[test]
    fn test_classify_transfer_shape() {
        let meta = classify_payload(&transfer_body(TRANSFER_TYPE, [0u8; 32]));
        let Meta::Transfer(transfer) = meta else {
            panic!("expected transfer, got {:?}", meta);
        };
        assert_eq!(transfer.from_chain, 5);
        assert_eq!(transfer.to_chain, 8);
        assert!(!transfer.has_relay_fee());
    }

    #[test]
    fn test_classify_transfer_with_payload_shape() {
        let mut payload = transfer_body(TRANSFER_WITH_PAYLOAD_TYPE, [0x09; 32]);
        payload.extend_from_slice(b"hello");

        let Meta::TransferWithPayload(twp) = classify_payload(&payload) else {
            panic!("expected transfer with payload");
        };
        assert_eq!(twp.transfer.fee, [0x09; 32]);
        assert_eq!(twp.payload, b"hello".to_vec());
    }

    #[test]
    fn test_short_transfer_with_payload_is_not_classified() {
        let mut payload = transfer_body(TRANSFER_WITH_PAYLOAD_TYPE, [0u8; 32]);
        payload.truncate(100);
        assert_eq!(classify_payload(&payload), Meta::Unknown);
    }

    #[test]
    fn test_register_chain_then_attest_shape_overrides() {
        let mut payload = TOKEN_BRIDGE_MODULE.to_vec();
        payload.push(1);
        payload.extend_from_slice(&0u16.to_be_bytes());
        payload.extend_from_slice(&2u16.to_be_bytes());
        payload.extend_from_slice(&[0x77; 32]);

        assert_eq!(classify_payload(&payload).name(), "TokenBridge RegisterChain");

        payload.extend_from_slice(&attest_payload(0x4e));
        assert_eq!(classify_payload(&payload).name(), "TokenBridge Attest");
    }

    #[test]
    fn test_core_governance_index_is_decoded() {
        let mut payload = CORE_MODULE.to_vec();
        payload.push(2);
        payload.extend_from_slice(&8u16.to_be_bytes());
        payload.extend_from_slice(&7u32.to_be_bytes());

        let Meta::CoreGovernance(gov) = classify_payload(&payload) else {
            panic!("expected core governance");
        };
        assert!(gov.is_guardian_set_upgrade());
        assert_eq!(gov.target_chain, 8);
        assert_eq!(gov.new_guardian_set_index, 7);
    }

    #[test]
    fn test_truncated_governance_is_unknown() {
        let mut payload = CORE_MODULE.to_vec();
        payload.push(2);
        assert_eq!(classify_payload(&payload), Meta::Unknown);
    }

    #[test]
    fn test_unrecognized_token_bridge_action() {
        let mut payload = TOKEN_BRIDGE_MODULE.to_vec();
        payload.push(9);
        assert_eq!(classify_payload(&payload), Meta::TokenBridge { action: 9 });
    }
}
