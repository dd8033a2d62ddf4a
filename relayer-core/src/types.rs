use crate::utils::{keccak256, sha512_256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte ledger account address.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn for_application(app_id: u64) -> Self {
        Address(sha512_256(b"appID", &app_id.to_be_bytes()))
    }

    /// Address of a logic program: the only valid signer for it is the program itself.
    pub fn for_program(program: &[u8]) -> Self {
        Address(sha512_256(b"Program", program))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    pub emitter_address: [u8; 32],
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
    pub meta: Meta,
}

impl Vaa {
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        bytes.push(self.version);
        bytes.extend_from_slice(&self.guardian_set_index.to_be_bytes());
        bytes.push(self.signatures.len() as u8);

        for sig in &self.signatures {
            bytes.push(sig.guardian_index);
            bytes.extend_from_slice(&sig.to_bytes());
        }

        bytes.extend_from_slice(&self.body());
        bytes
    }

    /// The signed portion of the VAA.
    pub fn body(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(51 + self.payload.len());
        data.extend_from_slice(&self.timestamp.to_be_bytes());
        data.extend_from_slice(&self.nonce.to_be_bytes());
        data.extend_from_slice(&self.emitter_chain.to_be_bytes());
        data.extend_from_slice(&self.emitter_address);
        data.extend_from_slice(&self.sequence.to_be_bytes());
        data.push(self.consistency_level);
        data.extend_from_slice(&self.payload);
        data
    }

    /// Double keccak of the body; this is what guardians sign.
    pub fn digest(&self) -> [u8; 32] {
        keccak256(&keccak256(&self.body()))
    }

    /// Concatenated `(index, r, s, v)` records exactly as they appear on the wire.
    pub fn signature_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.signatures.len() * SIGNATURE_RECORD_LEN);
        for sig in &self.signatures {
            bytes.push(sig.guardian_index);
            bytes.extend_from_slice(&sig.to_bytes());
        }
        bytes
    }
}

pub const SIGNATURE_RECORD_LEN: usize = 66;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub guardian_index: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    pub fn from_bytes(guardian_index: u8, bytes: &[u8; 65]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);

        Signature {
            guardian_index,
            r,
            s,
            v: bytes[64],
        }
    }
}

/// Guardian public-key hashes as stored in a guardian-set account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuardianSet {
    pub index: u32,
    pub keys: Vec<[u8; 20]>,
}

impl GuardianSet {
    /// Decodes the concatenated local state of a guardian account: a one-byte
    /// key count followed by packed 20-byte keys.
    pub fn from_local_state(index: u32, blob: &[u8]) -> Self {
        let Some((&count, packed)) = blob.split_first() else {
            return Self { index, keys: Vec::new() };
        };

        let keys = packed
            .chunks_exact(GUARDIAN_KEY_LEN)
            .take(count as usize)
            .map(|chunk| {
                let mut key = [0u8; 20];
                key.copy_from_slice(chunk);
                key
            })
            .collect();

        Self { index, keys }
    }

    /// Inverse of [`GuardianSet::from_local_state`].
    pub fn to_local_state(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(1 + self.keys.len() * GUARDIAN_KEY_LEN);
        blob.push(self.keys.len() as u8);
        for key in &self.keys {
            blob.extend_from_slice(key);
        }
        blob
    }

    pub fn key(&self, guardian_index: u8) -> Option<&[u8; 20]> {
        self.keys.get(guardian_index as usize)
    }
}

pub const GUARDIAN_KEY_LEN: usize = 20;

/// Decoded payload classification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Meta {
    Unknown,
    /// Token bridge module matched but the action byte was not recognized.
    TokenBridge { action: u8 },
    RegisterChain(RegisterChain),
    UpgradeContract(UpgradeContract),
    CoreGovernance(CoreGovernance),
    Attest(Attest),
    Transfer(Transfer),
    TransferWithPayload(TransferWithPayload),
}

impl Meta {
    pub fn name(&self) -> &'static str {
        match self {
            Meta::Unknown => "Unknown",
            Meta::TokenBridge { .. } => "TokenBridge",
            Meta::RegisterChain(_) => "TokenBridge RegisterChain",
            Meta::UpgradeContract(_) => "TokenBridge UpgradeContract",
            Meta::CoreGovernance(_) => "CoreGovernance",
            Meta::Attest(_) => "TokenBridge Attest",
            Meta::Transfer(_) => "TokenBridge Transfer",
            Meta::TransferWithPayload(_) => "TokenBridge Transfer With Payload",
        }
    }

    /// Payloads that move or describe a specific token.
    pub fn token_origin(&self) -> Option<&dyn TokenOrigin> {
        match self {
            Meta::Attest(attest) => Some(attest),
            Meta::Transfer(transfer) => Some(transfer),
            Meta::TransferWithPayload(transfer) => Some(transfer),
            _ => None,
        }
    }
}

/// Capability shared by payloads that name a token by its origin chain and contract.
pub trait TokenOrigin {
    fn from_chain(&self) -> u16;
    fn contract(&self) -> &[u8; 32];
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterChain {
    pub target_chain: u16,
    pub emitter_chain: u16,
    pub target_emitter: [u8; 32],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpgradeContract {
    pub target_chain: u16,
    pub new_contract: [u8; 32],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CoreGovernance {
    pub action: u8,
    pub target_chain: u16,
    pub new_guardian_set_index: u32,
}

impl CoreGovernance {
    pub const GUARDIAN_SET_UPGRADE: u8 = 2;

    pub fn is_guardian_set_upgrade(&self) -> bool {
        self.action == Self::GUARDIAN_SET_UPGRADE
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Attest {
    pub contract: [u8; 32],
    pub from_chain: u16,
    pub decimals: u8,
    pub symbol: [u8; 32],
    pub name: [u8; 32],
}

impl TokenOrigin for Attest {
    fn from_chain(&self) -> u16 {
        self.from_chain
    }

    fn contract(&self) -> &[u8; 32] {
        &self.contract
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub amount: [u8; 32],
    pub contract: [u8; 32],
    pub from_chain: u16,
    pub to_address: [u8; 32],
    pub to_chain: u16,
    pub fee: [u8; 32],
}

impl Transfer {
    pub fn has_relay_fee(&self) -> bool {
        self.fee != [0u8; 32]
    }
}

impl TokenOrigin for Transfer {
    fn from_chain(&self) -> u16 {
        self.from_chain
    }

    fn contract(&self) -> &[u8; 32] {
        &self.contract
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferWithPayload {
    pub transfer: Transfer,
    pub payload: Vec<u8>,
}

impl TokenOrigin for TransferWithPayload {
    fn from_chain(&self) -> u16 {
        self.transfer.from_chain
    }

    fn contract(&self) -> &[u8; 32] {
        &self.transfer.contract
    }
}

/// Lifecycle of one VAA submission.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Parsed,
    AccountsResolved,
    SignaturesBatched,
    Assembled,
    Submitted,
    Confirmed,
    Failed,
}
