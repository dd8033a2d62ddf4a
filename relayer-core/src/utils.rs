use sha2::Sha512_256;
use sha3::{Digest, Keccak256};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-512/256 over `prefix || data`, the ledger's domain-separated hash.
pub fn sha512_256(prefix: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(prefix);
    hasher.update(data);
    hasher.finalize().into()
}

pub fn to_32_bytes(address: &[u8]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let len = address.len().min(32);
    result[32 - len..].copy_from_slice(&address[..len]);
    result
}

/// Minimal big-endian encoding used for numeric app arguments; zero encodes as empty.
pub fn number_to_bytes(n: u64) -> Vec<u8> {
    n.to_be_bytes()
        .iter()
        .skip_while(|&&b| b == 0)
        .copied()
        .collect()
}

/// Unsigned LEB128, the integer encoding used inside program bytecode.
pub fn encode_uvarint(mut n: u64) -> Vec<u8> {
    let mut out = Vec::new();
    while n >= 0x80 {
        out.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
    out
}

pub fn read_u64_be(bytes: &[u8]) -> Option<u64> {
    let head: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(u64::from_be_bytes(head))
}
