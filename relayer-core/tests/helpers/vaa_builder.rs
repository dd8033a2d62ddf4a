use relayer_core::signer::Signer;
use relayer_core::{classify_payload, Vaa};

use super::fixtures::{FOREIGN_CHAIN, FOREIGN_EMITTER, TEST_GUARDIAN_KEYS};

pub struct VaaBuilder {
    guardian_set_index: u32,
    timestamp: u32,
    nonce: u32,
    emitter_chain: u16,
    emitter_address: [u8; 32],
    sequence: u64,
    consistency_level: u8,
    payload: Vec<u8>,
    signers: Vec<(u8, String)>,
}

impl VaaBuilder {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    pub fn with_guardian_set_index(mut self, index: u32) -> Self {
        self.guardian_set_index = index;
        self
    }

    pub fn with_emitter(mut self, chain: u16, address: [u8; 32]) -> Self {
        self.emitter_chain = chain;
        self.emitter_address = address;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn add_signature(mut self, private_key: &str, guardian_index: u8) -> Self {
        self.signers.push((guardian_index, private_key.to_string()));
        self
    }

    /// Signs with the first `count` test guardians, each at its own index.
    pub fn signed_by(mut self, count: usize) -> Self {
        for (i, key) in TEST_GUARDIAN_KEYS[..count].iter().enumerate() {
            self.signers.push((i as u8, key.to_string()));
        }
        self
    }

    pub fn build(self) -> Vaa {
        let meta = classify_payload(&self.payload);
        let mut vaa = Vaa {
            version: 1,
            guardian_set_index: self.guardian_set_index,
            signatures: Vec::new(),
            timestamp: self.timestamp,
            nonce: self.nonce,
            emitter_chain: self.emitter_chain,
            emitter_address: self.emitter_address,
            sequence: self.sequence,
            consistency_level: self.consistency_level,
            payload: self.payload,
            meta,
        };

        let digest = vaa.digest();
        for (guardian_index, key) in &self.signers {
            let signer = Signer::new(key).unwrap();
            vaa.signatures.push(signer.sign(digest, *guardian_index).unwrap());
        }
        vaa
    }

    pub fn build_bytes(self) -> Vec<u8> {
        self.build().serialize()
    }
}

impl Default for VaaBuilder {
    fn default() -> Self {
        Self {
            guardian_set_index: 0,
            timestamp: 1699276800,
            nonce: 0,
            emitter_chain: FOREIGN_CHAIN,
            emitter_address: FOREIGN_EMITTER,
            sequence: 42,
            consistency_level: 15,
            payload: Vec::new(),
            signers: Vec::new(),
        }
    }
}
