use crate::error::{RelayError, Result};
use crate::types::{GuardianSet, Signature, Vaa, GUARDIAN_KEY_LEN, SIGNATURE_RECORD_LEN};

/// One `verifySigs` call worth of signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBatch {
    pub signatures: Vec<Signature>,
    /// Wire records `(index, r, s, v)` for this batch.
    pub sig_bytes: Vec<u8>,
    /// Guardian key for each record, in the same order.
    pub key_set: Vec<u8>,
}

pub fn batch_count(signature_count: usize, max_per_txn: usize) -> usize {
    signature_count.div_ceil(max_per_txn.max(1))
}

/// Splits the VAA signatures, in order, into batches of at most `max_per_txn`
/// and pairs each signature with the key of the guardian it claims to be.
pub fn plan_signature_batches(
    vaa: &Vaa,
    guardian_set: &GuardianSet,
    max_per_txn: usize,
) -> Result<Vec<SignatureBatch>> {
    vaa.signatures
        .chunks(max_per_txn.max(1))
        .map(|chunk| {
            let mut sig_bytes = Vec::with_capacity(chunk.len() * SIGNATURE_RECORD_LEN);
            let mut key_set = Vec::with_capacity(chunk.len() * GUARDIAN_KEY_LEN);

            for sig in chunk {
                let key = guardian_set.key(sig.guardian_index).ok_or(
                    RelayError::GuardianKeyMissing {
                        guardian_index: sig.guardian_index,
                    },
                )?;
                sig_bytes.push(sig.guardian_index);
                sig_bytes.extend_from_slice(&sig.to_bytes());
                key_set.extend_from_slice(key);
            }

            Ok(SignatureBatch {
                signatures: chunk.to_vec(),
                sig_bytes,
                key_set,
            })
        })
        .collect()
}
