//! VAA submission orchestrator.
//!
//! A submission moves through `Parsed`, `AccountsResolved`,
//! `SignaturesBatched`, `Assembled`, `Submitted` and ends `Confirmed` or
//! `Failed`. The whole submission commits as one atomic group:
//! `[funding, verifySigs x N, verifyVAA, settlement...]`.

use crate::batch::{plan_signature_batches, SignatureBatch};
use crate::codec::decode_vaa;
use crate::config::RelayerConfig;
use crate::error::{LedgerError, RelayError, Result};
use crate::ledger::{ConfirmedTransaction, Ledger, SuggestedParams};
use crate::registry::MAX_BITS;
use crate::relayer::Relayer;
use crate::signer::preflight_signatures;
use crate::transaction::{Transaction, TransactionSigner};
use crate::types::{Address, GuardianSet, Meta, SubmissionState, Vaa};
use crate::utils::read_u64_be;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const VERIFY_SIGS: &[u8] = b"verifySigs";
pub const VERIFY_VAA: &[u8] = b"verifyVAA";
pub const GOVERNANCE: &[u8] = b"governance";
pub const RECEIVE_ATTEST: &[u8] = b"receiveAttest";
pub const RECEIVE_TRANSFER: &[u8] = b"receiveTransfer";
pub const NOP: &[u8] = b"nop";

/// Everything resolved for one VAA before its settlement is attached.
#[derive(Debug, Clone)]
pub struct SubmitVaaState {
    pub raw: Vec<u8>,
    pub vaa: Vaa,
    /// Sequence account, guardian account, then any payload accounts.
    pub accounts: Vec<Address>,
    pub guardian_address: Address,
    pub guardian_set: GuardianSet,
    pub batches: Vec<SignatureBatch>,
    pub txns: Vec<Transaction>,
    pub params: SuggestedParams,
    pub state: SubmissionState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub tx_id: String,
    pub confirmed_round: u64,
    pub logs: Vec<Vec<u8>>,
    pub group_size: usize,
    pub state: SubmissionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountRole {
    Sequence,
    Guardian,
    NextGuardian,
    Chain,
    Native,
}

/// Participation account a submission needs, before its address is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSlot {
    pub role: AccountRole,
    pub app_id: u64,
    pub addr_idx: u64,
    pub emitter_id: Vec<u8>,
}

/// Accounts a VAA touches, in the order the apps expect them: the sequence
/// account, the guardian account, then whatever the payload adds.
pub fn account_slots(vaa: &Vaa, config: &RelayerConfig, app_id: u64) -> Vec<AccountSlot> {
    let mut emitter_id = Vec::with_capacity(34);
    emitter_id.extend_from_slice(&vaa.emitter_chain.to_be_bytes());
    emitter_id.extend_from_slice(&vaa.emitter_address);

    let mut slots = vec![
        AccountSlot {
            role: AccountRole::Sequence,
            app_id,
            addr_idx: vaa.sequence / MAX_BITS,
            emitter_id,
        },
        AccountSlot {
            role: AccountRole::Guardian,
            app_id: config.core_app_id,
            addr_idx: u64::from(vaa.guardian_set_index),
            emitter_id: b"guardian".to_vec(),
        },
    ];

    if let Meta::CoreGovernance(governance) = &vaa.meta {
        if governance.is_guardian_set_upgrade() {
            slots.push(AccountSlot {
                role: AccountRole::NextGuardian,
                app_id: config.core_app_id,
                addr_idx: u64::from(governance.new_guardian_set_index),
                emitter_id: b"guardian".to_vec(),
            });
        }
    }

    if let Some(origin) = vaa.meta.token_origin() {
        let contract = origin.contract();
        if origin.from_chain() == config.home_chain {
            let asset = u32::from_be_bytes([contract[0], contract[1], contract[2], contract[3]]);
            slots.push(AccountSlot {
                role: AccountRole::Native,
                app_id: config.token_bridge_app_id,
                addr_idx: u64::from(asset),
                emitter_id: b"native".to_vec(),
            });
        } else {
            slots.push(AccountSlot {
                role: AccountRole::Chain,
                app_id: config.token_bridge_app_id,
                addr_idx: u64::from(origin.from_chain()),
                emitter_id: contract.to_vec(),
            });
        }
    }

    slots
}

/// Multiple of the base fee the settlement call pays to cover the inner
/// transactions the receiving app issues.
pub fn settlement_fee_multiplier(meta: &Meta) -> u64 {
    match meta {
        Meta::Attest(_) => 2,
        Meta::Transfer(transfer) => {
            if transfer.has_relay_fee() {
                3
            } else {
                2
            }
        }
        Meta::TransferWithPayload(twp) => {
            if twp.transfer.has_relay_fee() {
                3
            } else {
                2
            }
        }
        _ => 1,
    }
}

impl<L: Ledger, S: TransactionSigner> Relayer<L, S> {
    /// Parses `raw`, resolves every account the submission touches, batches the
    /// signatures and builds the funding, `verifySigs` and `verifyVAA` calls.
    ///
    /// `app_id` owns the sequence account that records this VAA as consumed.
    pub async fn prepare_submission(&self, raw: &[u8], app_id: u64) -> Result<SubmitVaaState> {
        let vaa = decode_vaa(raw)?;
        info!(
            meta = vaa.meta.name(),
            chain = vaa.emitter_chain,
            sequence = vaa.sequence,
            signatures = vaa.signatures.len(),
            state = ?SubmissionState::Parsed,
            "parsed VAA"
        );

        if matches!(vaa.meta, Meta::Unknown | Meta::TokenBridge { .. }) {
            warn!(sequence = vaa.sequence, "no settlement for payload");
            return Err(RelayError::UnknownPayload);
        }

        let accounts = self.resolve_accounts(&vaa, app_id).await?;
        let guardian_address = accounts[1];
        info!(accounts = accounts.len(), state = ?SubmissionState::AccountsResolved, "accounts resolved");

        let guardian_blob = self
            .decode_local_state(self.config().core_app_id, &guardian_address)
            .await?;
        let guardian_set = GuardianSet::from_local_state(vaa.guardian_set_index, &guardian_blob);
        if self.config().preflight_signatures {
            preflight_signatures(&vaa, &guardian_set)?;
            debug!("guardian signatures pre-verified");
        }

        let batches = plan_signature_batches(&vaa, &guardian_set, self.config().max_sigs_per_txn)?;
        info!(batches = batches.len(), state = ?SubmissionState::SignaturesBatched, "signatures batched");

        let params = self.ledger().suggested_params().await?;
        let txns = self.verification_txns(raw, &vaa, &accounts[..2], &batches, &params).await?;

        Ok(SubmitVaaState {
            raw: raw.to_vec(),
            vaa,
            accounts,
            guardian_address,
            guardian_set,
            batches,
            txns,
            params,
            state: SubmissionState::SignaturesBatched,
        })
    }

    async fn resolve_accounts(&self, vaa: &Vaa, app_id: u64) -> Result<Vec<Address>> {
        let mut accounts = Vec::with_capacity(4);
        for slot in account_slots(vaa, self.config(), app_id) {
            let address = self.optin(slot.app_id, slot.addr_idx, &slot.emitter_id).await?;
            debug!(role = ?slot.role, %address, "resolved account");
            accounts.push(address);
        }
        Ok(accounts)
    }

    async fn verification_txns(
        &self,
        raw: &[u8],
        vaa: &Vaa,
        header_accounts: &[Address],
        batches: &[SignatureBatch],
        params: &SuggestedParams,
    ) -> Result<Vec<Transaction>> {
        let core = self.config().core_app_id;
        let sender = self.signer().address();
        let verifier = self.verifier().address;
        let digest = vaa.digest();

        let balance = match self.ledger().account_information(&verifier).await {
            Ok(info) => info.amount,
            Err(LedgerError::NotFound) => 0,
            Err(err) => return Err(err.into()),
        };
        let top_up = self.funding_policy().top_up(balance);
        debug!(%verifier, balance, top_up, "funding verifier");

        let mut txns = Vec::with_capacity(batches.len() + 2);
        txns.push(Transaction::payment(sender, verifier, top_up, params));

        for batch in batches {
            txns.push(
                Transaction::app_call(verifier, core, params)
                    .arg(VERIFY_SIGS)
                    .arg(batch.sig_bytes.clone())
                    .arg(batch.key_set.clone())
                    .arg(digest.to_vec())
                    .accounts(header_accounts)
                    .build(),
            );
        }

        txns.push(
            Transaction::app_call(sender, core, params)
                .arg(VERIFY_VAA)
                .arg(raw.to_vec())
                .accounts(header_accounts)
                .build(),
        );

        Ok(txns)
    }

    /// Appends the settlement calls for the payload variant.
    pub async fn assemble(&self, mut state: SubmitVaaState) -> Result<SubmitVaaState> {
        let config = self.config();
        let sender = self.signer().address();
        let params = state.params.clone();
        let raw = state.raw.clone();
        let multiplier = settlement_fee_multiplier(&state.vaa.meta);

        match &state.vaa.meta {
            Meta::CoreGovernance(_) => {
                state.txns.push(
                    Transaction::app_call(sender, config.core_app_id, &params)
                        .arg(GOVERNANCE)
                        .arg(raw)
                        .accounts(&state.accounts)
                        .build(),
                );
            }
            Meta::RegisterChain(_) | Meta::UpgradeContract(_) => {
                state.txns.push(
                    Transaction::app_call(sender, config.token_bridge_app_id, &params)
                        .arg(GOVERNANCE)
                        .arg(raw)
                        .accounts(&state.accounts)
                        .foreign_apps(&[config.core_app_id])
                        .build(),
                );
            }
            Meta::Attest(_) => {
                let chain_address = *state.accounts.last().ok_or(RelayError::UnknownPayload)?;
                let known = self
                    .decode_local_state(config.token_bridge_app_id, &chain_address)
                    .await?;
                let foreign_assets: Vec<u64> = if known.len() > 8 {
                    read_u64_be(&known).into_iter().collect()
                } else {
                    Vec::new()
                };

                state
                    .txns
                    .push(Transaction::payment(sender, chain_address, config.attest_top_up, &params));
                for calibration in [1u8, 2] {
                    state.txns.push(
                        Transaction::app_call(sender, config.token_bridge_app_id, &params)
                            .arg(NOP)
                            .arg(vec![calibration])
                            .build(),
                    );
                }

                let mut settle = Transaction::app_call(sender, config.token_bridge_app_id, &params)
                    .arg(RECEIVE_ATTEST)
                    .arg(raw)
                    .accounts(&state.accounts)
                    .foreign_assets(&foreign_assets)
                    .build();
                settle.fee *= multiplier;
                state.txns.push(settle);
            }
            Meta::Transfer(_) | Meta::TransferWithPayload(_) => {
                let transfer = match &state.vaa.meta {
                    Meta::Transfer(transfer) => transfer.clone(),
                    Meta::TransferWithPayload(twp) => twp.transfer.clone(),
                    _ => return Err(RelayError::UnknownPayload),
                };

                let asset_id = if transfer.from_chain != config.home_chain {
                    let chain_address = *state.accounts.last().ok_or(RelayError::UnknownPayload)?;
                    let known = self
                        .decode_local_state(config.token_bridge_app_id, &chain_address)
                        .await?;
                    if known.len() > 8 {
                        read_u64_be(&known).unwrap_or(0)
                    } else {
                        0
                    }
                } else {
                    read_u64_be(&transfer.contract).unwrap_or(0)
                };

                let receiver = Address(transfer.to_address);
                let mut foreign_assets = Vec::new();
                if asset_id != 0 {
                    foreign_assets.push(asset_id);
                    self.asset_optin(asset_id, &receiver).await?;
                    if transfer.has_relay_fee() {
                        self.asset_optin(asset_id, &sender).await?;
                    }
                }
                state.accounts.push(receiver);

                let mut settle = Transaction::app_call(sender, config.token_bridge_app_id, &params)
                    .arg(RECEIVE_TRANSFER)
                    .arg(raw)
                    .accounts(&state.accounts)
                    .foreign_assets(&foreign_assets)
                    .build();
                settle.fee *= multiplier;
                state.txns.push(settle);
            }
            Meta::Unknown | Meta::TokenBridge { .. } => return Err(RelayError::UnknownPayload),
        }

        state.state = SubmissionState::Assembled;
        info!(meta = state.vaa.meta.name(), size = state.txns.len(), "group assembled");
        Ok(state)
    }

    /// Relays one VAA end to end and waits for the group to confirm.
    pub async fn submit_vaa(&self, raw: &[u8], app_id: u64) -> Result<SubmissionOutcome> {
        let state = self.prepare_submission(raw, app_id).await?;
        let state = self.assemble(state).await?;
        let group_size = state.txns.len();

        info!(
            sequence = state.vaa.sequence,
            size = group_size,
            state = ?SubmissionState::Submitted,
            "submitting group"
        );
        match self.sign_and_send(state.txns, self.config().confirmation_rounds).await {
            Ok(confirmed) => Ok(outcome(confirmed, group_size)),
            Err(err) => {
                warn!(
                    sequence = state.vaa.sequence,
                    error = %err,
                    state = ?SubmissionState::Failed,
                    "submission failed"
                );
                Err(err)
            }
        }
    }

    /// Creates the wrapped asset described by an attestation.
    pub async fn create_wrapped(&self, attest_vaa: &[u8]) -> Result<SubmissionOutcome> {
        self.submit_vaa(attest_vaa, self.config().token_bridge_app_id).await
    }

    /// Refreshes the metadata of an already wrapped asset.
    pub async fn update_wrapped(&self, attest_vaa: &[u8]) -> Result<SubmissionOutcome> {
        self.submit_vaa(attest_vaa, self.config().token_bridge_app_id).await
    }

    /// Completes an inbound transfer.
    pub async fn redeem(&self, transfer_vaa: &[u8], app_id: u64) -> Result<SubmissionOutcome> {
        self.submit_vaa(transfer_vaa, app_id).await
    }
}

fn outcome(confirmed: ConfirmedTransaction, group_size: usize) -> SubmissionOutcome {
    SubmissionOutcome {
        tx_id: confirmed.tx_id,
        confirmed_round: confirmed.confirmed_round,
        logs: confirmed.logs,
        group_size,
        state: SubmissionState::Confirmed,
    }
}
