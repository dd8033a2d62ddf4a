//! Destination-ledger collaborator.
//!
//! The relayer only needs account reads, application state, suggested
//! parameters, group broadcast, confirmation and paginated transaction
//! search. Implementations wrap a node/indexer client; [`crate::MockLedger`]
//! is an in-memory implementation.

use crate::error::LedgerError;
use crate::transaction::SignedTransaction;
use crate::types::Address;
use serde::{Deserialize, Serialize};

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestedParams {
    pub fee: u64,
    pub min_fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_hash: [u8; 32],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Bytes(Vec<u8>),
    Uint(u64),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: StateValue,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AppLocalState {
    pub app_id: u64,
    pub key_values: Vec<KeyValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssetHolding {
    pub asset_id: u64,
    pub amount: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountInformation {
    pub address: Address,
    pub amount: u64,
    pub auth_addr: Option<Address>,
    pub assets: Vec<AssetHolding>,
    pub apps_local_state: Vec<AppLocalState>,
}

impl AccountInformation {
    pub fn local_state(&self, app_id: u64) -> Option<&AppLocalState> {
        self.apps_local_state.iter().find(|app| app.app_id == app_id)
    }

    pub fn holds_asset(&self, asset_id: u64) -> bool {
        self.assets.iter().any(|holding| holding.asset_id == asset_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssetInformation {
    pub asset_id: u64,
    pub creator: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfirmedTransaction {
    pub tx_id: String,
    pub confirmed_round: u64,
    pub logs: Vec<Vec<u8>>,
    pub inner_txns: Vec<ConfirmedTransaction>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub note_prefix: Vec<u8>,
    pub min_round: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexedAppCall {
    pub app_id: u64,
    pub args: Vec<Vec<u8>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexedTransaction {
    pub id: String,
    pub sender: Address,
    pub confirmed_round: u64,
    pub app_call: Option<IndexedAppCall>,
    pub logs: Vec<Vec<u8>>,
    pub inner_txns: Vec<IndexedTransaction>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionPage {
    pub transactions: Vec<IndexedTransaction>,
    pub next_token: Option<String>,
    pub current_round: u64,
}

#[allow(async_fn_in_trait)]
pub trait Ledger {
    async fn account_information(&self, address: &Address) -> LedgerResult<AccountInformation>;

    async fn application_global_state(&self, app_id: u64) -> LedgerResult<Vec<KeyValue>>;

    async fn asset_information(&self, asset_id: u64) -> LedgerResult<AssetInformation>;

    async fn suggested_params(&self) -> LedgerResult<SuggestedParams>;

    /// Broadcasts one atomic group and returns the id of its first transaction.
    async fn send_transactions(&self, group: &[SignedTransaction]) -> LedgerResult<String>;

    async fn wait_for_confirmation(&self, tx_id: &str, max_rounds: u64) -> LedgerResult<ConfirmedTransaction>;

    async fn search_transactions(
        &self,
        query: &TransactionQuery,
        next_token: Option<&str>,
    ) -> LedgerResult<TransactionPage>;
}
