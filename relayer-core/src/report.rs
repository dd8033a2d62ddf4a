//! JSON views of VAAs and submission groups.

use crate::batch::batch_count;
use crate::config::RelayerConfig;
use crate::registry::participation_program;
use crate::submit::{account_slots, settlement_fee_multiplier, AccountRole, SubmitVaaState};
use crate::template::verifier_program;
use crate::transaction::{Transaction, TransactionKind};
use crate::types::{Meta, SubmissionState, Vaa};
use serde::Serialize;

fn hex0x(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VaaReport {
    pub vaa_bytes: String,
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<SignatureJson>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    pub emitter_address: String,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: String,
    pub digest: String,
    pub meta: String,
    pub payload_fields: serde_json::Value,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SignatureJson {
    pub index: u8,
    pub signature: String,
}

impl From<&Vaa> for VaaReport {
    fn from(vaa: &Vaa) -> Self {
        Self {
            vaa_bytes: hex0x(&vaa.serialize()),
            version: vaa.version,
            guardian_set_index: vaa.guardian_set_index,
            signatures: vaa
                .signatures
                .iter()
                .map(|s| SignatureJson {
                    index: s.guardian_index,
                    signature: hex0x(&s.to_bytes()),
                })
                .collect(),
            timestamp: vaa.timestamp,
            nonce: vaa.nonce,
            emitter_chain: vaa.emitter_chain,
            emitter_address: hex0x(&vaa.emitter_address),
            sequence: vaa.sequence,
            consistency_level: vaa.consistency_level,
            payload: hex0x(&vaa.payload),
            digest: hex0x(&vaa.digest()),
            meta: vaa.meta.name().to_string(),
            payload_fields: payload_fields(&vaa.meta),
        }
    }
}

fn payload_fields(meta: &Meta) -> serde_json::Value {
    use serde_json::json;

    match meta {
        Meta::Unknown => json!({}),
        Meta::TokenBridge { action } => json!({ "action": action }),
        Meta::RegisterChain(rc) => json!({
            "targetChain": rc.target_chain,
            "emitterChain": rc.emitter_chain,
            "targetEmitter": hex0x(&rc.target_emitter),
        }),
        Meta::UpgradeContract(uc) => json!({
            "targetChain": uc.target_chain,
            "newContract": hex0x(&uc.new_contract),
        }),
        Meta::CoreGovernance(cg) => json!({
            "action": cg.action,
            "targetChain": cg.target_chain,
            "newGuardianSetIndex": cg.new_guardian_set_index,
        }),
        Meta::Attest(attest) => json!({
            "contract": hex0x(&attest.contract),
            "fromChain": attest.from_chain,
            "decimals": attest.decimals,
            "symbol": hex0x(&attest.symbol),
            "name": hex0x(&attest.name),
        }),
        Meta::Transfer(transfer) => transfer_fields(transfer),
        Meta::TransferWithPayload(twp) => {
            let mut fields = transfer_fields(&twp.transfer);
            fields["payload"] = json!(hex0x(&twp.payload));
            fields
        }
    }
}

fn transfer_fields(transfer: &crate::types::Transfer) -> serde_json::Value {
    serde_json::json!({
        "amount": hex0x(&transfer.amount),
        "contract": hex0x(&transfer.contract),
        "fromChain": transfer.from_chain,
        "toAddress": hex0x(&transfer.to_address),
        "toChain": transfer.to_chain,
        "fee": hex0x(&transfer.fee),
    })
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountPlan {
    pub role: AccountRole,
    pub app_id: u64,
    pub addr_idx: u64,
    pub emitter_id: String,
    pub address: String,
}

/// What relaying a VAA will touch, derived without any ledger access.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPlan {
    pub meta: String,
    pub verifier: String,
    pub accounts: Vec<AccountPlan>,
    pub signature_batches: usize,
    pub settlement_fee_multiplier: u64,
    pub settles: bool,
}

impl SubmissionPlan {
    pub fn new(vaa: &Vaa, config: &RelayerConfig, app_id: u64) -> Self {
        let accounts = account_slots(vaa, config, app_id)
            .into_iter()
            .map(|slot| {
                let program =
                    participation_program(config.seed_amount, slot.app_id, slot.addr_idx, &slot.emitter_id);
                AccountPlan {
                    role: slot.role,
                    app_id: slot.app_id,
                    addr_idx: slot.addr_idx,
                    emitter_id: hex0x(&slot.emitter_id),
                    address: hex0x(program.address.as_bytes()),
                }
            })
            .collect();

        Self {
            meta: vaa.meta.name().to_string(),
            verifier: hex0x(verifier_program().address.as_bytes()),
            accounts,
            signature_batches: batch_count(vaa.signatures.len(), config.max_sigs_per_txn),
            settlement_fee_multiplier: settlement_fee_multiplier(&vaa.meta),
            settles: !matches!(vaa.meta, Meta::Unknown | Meta::TokenBridge { .. }),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub tx_id: String,
    pub sender: String,
    pub kind: String,
    pub method: Option<String>,
    pub fee: u64,
}

impl From<&Transaction> for TransactionSummary {
    fn from(txn: &Transaction) -> Self {
        let kind = match &txn.kind {
            TransactionKind::Payment { .. } => "pay",
            TransactionKind::AssetTransfer { .. } => "axfer",
            TransactionKind::ApplicationCall { .. } => "appl",
        };

        Self {
            tx_id: txn.id_hex(),
            sender: hex0x(txn.sender.as_bytes()),
            kind: kind.to_string(),
            method: txn.method().map(|m| String::from_utf8_lossy(m).into_owned()),
            fee: txn.fee,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub state: SubmissionState,
    pub accounts: Vec<String>,
    pub transactions: Vec<TransactionSummary>,
}

impl From<&SubmitVaaState> for GroupReport {
    fn from(state: &SubmitVaaState) -> Self {
        Self {
            state: state.state,
            accounts: state.accounts.iter().map(|a| hex0x(a.as_bytes())).collect(),
            transactions: state.txns.iter().map(TransactionSummary::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_vaa;

    fn core_upgrade_vaa() -> Vec<u8> {
        let mut raw = vec![1, 0, 0, 0, 0, 0];
        raw.extend_from_slice(&[0u8; 8]);
        raw.extend_from_slice(&1u16.to_be_bytes());
        raw.extend_from_slice(&[4u8; 32]);
        raw.extend_from_slice(&7u64.to_be_bytes());
        raw.push(1);
        raw.extend_from_slice(&crate::codec::CORE_MODULE);
        raw.push(2);
        raw.extend_from_slice(&0u16.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw
    }

    #[test]
    fn test_vaa_report_uses_prefixed_hex() {
        let vaa = decode_vaa(&core_upgrade_vaa()).unwrap();
        let json = serde_json::to_value(VaaReport::from(&vaa)).unwrap();

        assert_eq!(json["meta"], "CoreGovernance");
        assert_eq!(json["emitterChain"], 1);
        assert!(json["emitterAddress"].as_str().unwrap().starts_with("0x0404"));
        assert_eq!(json["payloadFields"]["newGuardianSetIndex"], 1);
    }

    #[test]
    fn test_plan_includes_next_guardian_account() {
        let vaa = decode_vaa(&core_upgrade_vaa()).unwrap();
        let config = RelayerConfig::default_test_config();
        let plan = SubmissionPlan::new(&vaa, &config, config.core_app_id);

        let roles: Vec<AccountRole> = plan.accounts.iter().map(|a| a.role).collect();
        assert_eq!(
            roles,
            vec![AccountRole::Sequence, AccountRole::Guardian, AccountRole::NextGuardian]
        );
        assert_eq!(plan.signature_batches, 0);
        assert!(plan.settles);
    }
}
