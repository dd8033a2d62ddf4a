//! Program-derived participation accounts.
//!
//! Every (app, slot, emitter) triple maps to a deterministic address derived
//! from the participation template. The first caller bootstraps it: seed the
//! address, opt it in to the app, then rekey it to the app address so only the
//! app's logic can drive it afterwards.

use crate::error::{LedgerError, RelayError, Result};
use crate::ledger::{KeyValue, Ledger, StateValue};
use crate::relayer::Relayer;
use crate::template::{LogicProgram, PopulateData, PARTICIPATION_TEMPLATE};
use crate::transaction::{assign_group_id, SignedTransaction, Transaction, TransactionSigner};
use crate::types::{Address, GuardianSet};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Width of one local-state value slot.
pub const LOCAL_STATE_SLOT_LEN: usize = 127;
/// Local-state keys available to a participation account.
pub const LOCAL_STATE_KEYS: usize = 15;
/// Sequence numbers tracked by one sequence account (one bit each).
pub const MAX_BITS: u64 = 8 * LOCAL_STATE_SLOT_LEN as u64 * LOCAL_STATE_KEYS as u64;

const META_KEY: &[u8] = b"meta";

pub fn participation_program(seed_amount: u64, app_id: u64, addr_idx: u64, emitter_id: &[u8]) -> LogicProgram {
    PARTICIPATION_TEMPLATE.populate(&PopulateData {
        addr_idx,
        app_address: Address::for_application(app_id),
        app_id,
        emitter_id: emitter_id.to_vec(),
        seed_amount,
    })
}

impl<L: Ledger, S: TransactionSigner> Relayer<L, S> {
    pub fn participation_program(&self, app_id: u64, addr_idx: u64, emitter_id: &[u8]) -> LogicProgram {
        participation_program(self.config().seed_amount, app_id, addr_idx, emitter_id)
    }

    /// Whether `address` has opted in to `app_id`. An account the ledger has
    /// never seen does not exist rather than being an error.
    pub async fn account_exists(&self, app_id: u64, address: &Address) -> Result<bool> {
        match self.ledger().account_information(address).await {
            Ok(info) => Ok(info.local_state(app_id).is_some()),
            Err(LedgerError::NotFound) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolves the participation account for `(app_id, addr_idx, emitter_id)`,
    /// bootstrapping it when it does not exist yet.
    pub async fn optin(&self, app_id: u64, addr_idx: u64, emitter_id: &[u8]) -> Result<Address> {
        let program = self.participation_program(app_id, addr_idx, emitter_id);
        let address = program.address;
        debug!(app_id, addr_idx, emitter = %hex::encode(emitter_id), %address, "derived participation account");

        if self.account_exists(app_id, &address).await? {
            return Ok(address);
        }

        info!(app_id, addr_idx, %address, "bootstrapping participation account");
        let params = self.ledger().suggested_params().await?;

        let mut txns = vec![
            Transaction::payment(self.signer().address(), address, self.config().seed_amount, &params),
            Transaction::app_optin(address, app_id, &params),
            Transaction::rekey(address, Address::for_application(app_id), &params),
        ];
        assign_group_id(&mut txns);

        let mut signed = Vec::with_capacity(txns.len());
        let mut txns = txns.into_iter();
        if let Some(seed) = txns.next() {
            signed.push(self.signer().sign_transaction(seed)?);
        }
        signed.extend(txns.map(|txn| SignedTransaction::with_program(txn, &program)));

        match self.broadcast(&signed, self.config().confirmation_rounds).await {
            Ok(_) => Ok(address),
            Err(RelayError::Ledger(LedgerError::Rejected(reason))) => {
                warn!(%address, %reason, "bootstrap rejected, re-checking existence");
                if self.account_exists(app_id, &address).await? {
                    Ok(address)
                } else {
                    Err(RelayError::AccountBootstrapRace {
                        address: address.to_hex(),
                    })
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Concatenated local-state blob `address` holds for `app_id`.
    pub async fn decode_local_state(&self, app_id: u64, address: &Address) -> Result<Vec<u8>> {
        let info = match self.ledger().account_information(address).await {
            Ok(info) => info,
            Err(LedgerError::NotFound) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        Ok(info
            .local_state(app_id)
            .map(|state| decode_local_state_values(&state.key_values))
            .unwrap_or_default())
    }

    /// Resolves the account holding guardian set `index` and reads its key table.
    pub async fn guardian_set(&self, index: u32) -> Result<(Address, GuardianSet)> {
        let core = self.config().core_app_id;
        let address = self.optin(core, u64::from(index), b"guardian").await?;
        let blob = self.decode_local_state(core, &address).await?;
        let set = GuardianSet::from_local_state(index, &blob);
        debug!(index, %address, keys = set.keys.len(), "loaded guardian set");
        Ok((address, set))
    }
}

/// Joins the non-default value slots in key order. The `meta` key is not part
/// of the blob; slot number is the first byte of each key.
pub fn decode_local_state_values(key_values: &[KeyValue]) -> Vec<u8> {
    let empty = [0u8; LOCAL_STATE_SLOT_LEN];
    let mut slots = BTreeMap::new();

    for kv in key_values {
        if kv.key.as_slice() == META_KEY {
            continue;
        }
        let Some(&slot) = kv.key.first() else {
            continue;
        };
        let StateValue::Bytes(value) = &kv.value else {
            continue;
        };
        if value.as_slice() == empty.as_slice() {
            continue;
        }
        slots.insert(slot, value.as_slice());
    }

    slots.into_values().flatten().copied().collect()
}

/// Lays a blob out the way the apps store it: zero-padded 127-byte slots
/// under single-byte keys, at most 15 of them.
pub fn encode_local_state(blob: &[u8]) -> Vec<KeyValue> {
    blob.chunks(LOCAL_STATE_SLOT_LEN)
        .take(LOCAL_STATE_KEYS)
        .enumerate()
        .map(|(slot, chunk)| {
            let mut value = chunk.to_vec();
            value.resize(LOCAL_STATE_SLOT_LEN, 0);
            KeyValue {
                key: vec![slot as u8],
                value: StateValue::Bytes(value),
            }
        })
        .collect()
}
