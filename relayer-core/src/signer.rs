use crate::error::RelayError;
use crate::types::{GuardianSet, Signature, Vaa};
use anyhow::{anyhow, Result};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

/// Guardian key, used to produce VAA signatures on devnets and in tests.
pub struct Signer {
    secret_key: SecretKey,
    secp: Secp256k1<secp256k1::All>,
}

impl Signer {
    pub fn new(private_key_hex: &str) -> Result<Self> {
        let private_key_bytes = hex::decode(private_key_hex.trim_start_matches("0x"))?;
        let secret_key = SecretKey::from_slice(&private_key_bytes)?;
        let secp = Secp256k1::new();

        Ok(Self { secret_key, secp })
    }

    /// Signs a 32-byte digest; `v` is the raw recovery id as carried in VAAs.
    pub fn sign(&self, digest: [u8; 32], guardian_index: u8) -> Result<Signature> {
        let message = Message::from_digest_slice(&digest)?;
        let sig = self.secp.sign_ecdsa_recoverable(&message, &self.secret_key);

        let (recovery_id, compact_sig) = sig.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact_sig[0..32]);
        s.copy_from_slice(&compact_sig[32..64]);

        Ok(Signature {
            guardian_index,
            r,
            s,
            v: recovery_id.to_i32() as u8,
        })
    }

    pub fn get_address(&self) -> [u8; 20] {
        let public_key = PublicKey::from_secret_key(&self.secp, &self.secret_key);
        public_key_address(&public_key)
    }
}

fn public_key_address(public_key: &PublicKey) -> [u8; 20] {
    let public_key_bytes = public_key.serialize_uncompressed();

    let mut hasher = Keccak256::new();
    hasher.update(&public_key_bytes[1..]);
    let hash = hasher.finalize();

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..32]);
    address
}

/// Recovers the guardian key hash from a signature; accepts `v` as 0/1 or 27/28.
pub fn recover_signer(digest: [u8; 32], signature: &[u8; 65]) -> Result<[u8; 20]> {
    let secp = Secp256k1::new();

    let v = signature[64];
    let recovery = if v >= 27 { v - 27 } else { v };
    let recovery_id = secp256k1::ecdsa::RecoveryId::from_i32(recovery as i32)?;

    let recoverable_sig =
        secp256k1::ecdsa::RecoverableSignature::from_compact(&signature[0..64], recovery_id)?;
    let message = Message::from_digest_slice(&digest)?;
    let public_key = secp.recover_ecdsa(&message, &recoverable_sig)?;

    Ok(public_key_address(&public_key))
}

pub fn verify_guardian_signature(
    digest: [u8; 32],
    signature: &[u8; 65],
    guardian_index: u8,
    guardian_set: &GuardianSet,
) -> Result<()> {
    let guardian_key = guardian_set
        .key(guardian_index)
        .ok_or_else(|| anyhow!("Invalid guardian index"))?;

    let recovered_address = recover_signer(digest, signature)?;

    if recovered_address != *guardian_key {
        return Err(anyhow!("Signature verification failed"));
    }

    Ok(())
}

/// Checks every VAA signature against the key table before any fee is spent.
pub fn preflight_signatures(vaa: &Vaa, guardian_set: &GuardianSet) -> crate::error::Result<()> {
    let digest = vaa.digest();

    for sig in &vaa.signatures {
        if guardian_set.key(sig.guardian_index).is_none() {
            return Err(RelayError::GuardianKeyMissing {
                guardian_index: sig.guardian_index,
            });
        }
        verify_guardian_signature(digest, &sig.to_bytes(), sig.guardian_index, guardian_set)
            .map_err(|_| RelayError::InvalidSignature {
                guardian_index: sig.guardian_index,
            })?;
    }

    Ok(())
}
