use crate::error::LedgerError;
use crate::ledger::{
    AccountInformation, AppLocalState, AssetHolding, AssetInformation, ConfirmedTransaction,
    KeyValue, Ledger, LedgerResult, SuggestedParams, TransactionPage, TransactionQuery,
};
use crate::transaction::{OnComplete, SignedTransaction, TransactionKind};
use crate::types::Address;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory ledger with atomic group semantics.
///
/// Payments, asset transfers, opt-ins and rekeys change account state;
/// application calls are otherwise opaque and only recorded.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<RwLock<LedgerState>>,
}

struct LedgerState {
    accounts: HashMap<Address, AccountInformation>,
    global_state: HashMap<u64, Vec<KeyValue>>,
    assets: HashMap<u64, AssetInformation>,
    params: SuggestedParams,
    round: u64,
    groups: Vec<Vec<SignedTransaction>>,
    confirmations: HashMap<String, ConfirmedTransaction>,
    queued_confirmations: VecDeque<ConfirmedTransaction>,
    search_pages: VecDeque<TransactionPage>,
    queries: Vec<(TransactionQuery, Option<String>)>,
    withhold_confirmations: bool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState {
                accounts: HashMap::new(),
                global_state: HashMap::new(),
                assets: HashMap::new(),
                params: SuggestedParams {
                    fee: 1000,
                    min_fee: 1000,
                    first_valid: 1,
                    last_valid: 1001,
                    genesis_hash: [0x47; 32],
                },
                round: 1,
                groups: Vec::new(),
                confirmations: HashMap::new(),
                queued_confirmations: VecDeque::new(),
                search_pages: VecDeque::new(),
                queries: Vec::new(),
                withhold_confirmations: false,
            })),
        }
    }

    pub async fn fund(&self, address: Address, amount: u64) {
        let mut state = self.state.write().await;
        account_entry(&mut state.accounts, address).amount += amount;
    }

    pub async fn set_balance(&self, address: Address, amount: u64) {
        let mut state = self.state.write().await;
        account_entry(&mut state.accounts, address).amount = amount;
    }

    /// Replaces the local state `address` holds for `app_id`, opting it in if needed.
    pub async fn set_local_state(&self, address: Address, app_id: u64, key_values: Vec<KeyValue>) {
        let mut state = self.state.write().await;
        let account = account_entry(&mut state.accounts, address);
        account.apps_local_state.retain(|app| app.app_id != app_id);
        account.apps_local_state.push(AppLocalState { app_id, key_values });
    }

    pub async fn set_global_state(&self, app_id: u64, key_values: Vec<KeyValue>) {
        self.state.write().await.global_state.insert(app_id, key_values);
    }

    pub async fn create_asset(&self, asset_id: u64, creator: Address) {
        let mut state = self.state.write().await;
        state.assets.insert(asset_id, AssetInformation { asset_id, creator });
        account_entry(&mut state.accounts, creator)
            .assets
            .push(AssetHolding { asset_id, amount: u64::MAX / 2 });
    }

    pub async fn set_auth_addr(&self, address: Address, auth: Address) {
        let mut state = self.state.write().await;
        account_entry(&mut state.accounts, address).auth_addr = Some(auth);
    }

    /// The next confirmed group reports these logs and inner transactions.
    pub async fn queue_confirmation(&self, confirmation: ConfirmedTransaction) {
        self.state.write().await.queued_confirmations.push_back(confirmation);
    }

    pub async fn push_search_page(&self, page: TransactionPage) {
        self.state.write().await.search_pages.push_back(page);
    }

    pub async fn withhold_confirmations(&self, withhold: bool) {
        self.state.write().await.withhold_confirmations = withhold;
    }

    pub async fn submitted_groups(&self) -> Vec<Vec<SignedTransaction>> {
        self.state.read().await.groups.clone()
    }

    pub async fn search_queries(&self) -> Vec<(TransactionQuery, Option<String>)> {
        self.state.read().await.queries.clone()
    }

    pub async fn account(&self, address: &Address) -> Option<AccountInformation> {
        self.state.read().await.accounts.get(address).cloned()
    }

    pub async fn current_round(&self) -> u64 {
        self.state.read().await.round
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn account_entry(
    accounts: &mut HashMap<Address, AccountInformation>,
    address: Address,
) -> &mut AccountInformation {
    accounts.entry(address).or_insert_with(|| AccountInformation {
        address,
        ..Default::default()
    })
}

fn debit(
    accounts: &mut HashMap<Address, AccountInformation>,
    address: Address,
    amount: u64,
) -> LedgerResult<()> {
    let account = account_entry(accounts, address);
    if account.amount < amount {
        return Err(LedgerError::InsufficientFunds {
            address: address.to_hex(),
        });
    }
    account.amount -= amount;
    Ok(())
}

fn apply(
    accounts: &mut HashMap<Address, AccountInformation>,
    stxn: &SignedTransaction,
) -> LedgerResult<()> {
    let txn = &stxn.txn;
    let expected = accounts
        .get(&txn.sender)
        .and_then(|account| account.auth_addr)
        .unwrap_or(txn.sender);
    if stxn.authorizer() != expected {
        return Err(LedgerError::Rejected(format!(
            "{} is not authorized to sign for {}",
            stxn.authorizer(),
            txn.sender
        )));
    }

    debit(accounts, txn.sender, txn.fee)?;

    match &txn.kind {
        TransactionKind::Payment { receiver, amount } => {
            debit(accounts, txn.sender, *amount)?;
            account_entry(accounts, *receiver).amount += amount;
        }
        TransactionKind::AssetTransfer { asset_id, receiver, amount } => {
            if *amount > 0 {
                let sender = account_entry(accounts, txn.sender);
                let holding = sender
                    .assets
                    .iter_mut()
                    .find(|holding| holding.asset_id == *asset_id)
                    .filter(|holding| holding.amount >= *amount)
                    .ok_or_else(|| {
                        LedgerError::Rejected(format!("{} cannot send asset {}", txn.sender, asset_id))
                    })?;
                holding.amount -= amount;
            }
            let receiver = account_entry(accounts, *receiver);
            match receiver.assets.iter_mut().find(|holding| holding.asset_id == *asset_id) {
                Some(holding) => holding.amount += amount,
                None => receiver.assets.push(AssetHolding {
                    asset_id: *asset_id,
                    amount: *amount,
                }),
            }
        }
        TransactionKind::ApplicationCall { app_id, on_complete, .. } => {
            if *on_complete == OnComplete::OptIn {
                let account = account_entry(accounts, txn.sender);
                if account.local_state(*app_id).is_some() {
                    return Err(LedgerError::Rejected(format!(
                        "{} already opted in to {}",
                        txn.sender, app_id
                    )));
                }
                account.apps_local_state.push(AppLocalState {
                    app_id: *app_id,
                    key_values: Vec::new(),
                });
            }
        }
    }

    if let Some(auth) = txn.rekey_to {
        account_entry(accounts, txn.sender).auth_addr = Some(auth);
    }

    Ok(())
}

impl Ledger for MockLedger {
    async fn account_information(&self, address: &Address) -> LedgerResult<AccountInformation> {
        self.state
            .read()
            .await
            .accounts
            .get(address)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn application_global_state(&self, app_id: u64) -> LedgerResult<Vec<KeyValue>> {
        Ok(self
            .state
            .read()
            .await
            .global_state
            .get(&app_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn asset_information(&self, asset_id: u64) -> LedgerResult<AssetInformation> {
        self.state
            .read()
            .await
            .assets
            .get(&asset_id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn suggested_params(&self) -> LedgerResult<SuggestedParams> {
        Ok(self.state.read().await.params.clone())
    }

    async fn send_transactions(&self, group: &[SignedTransaction]) -> LedgerResult<String> {
        let mut state = self.state.write().await;

        let first = group
            .first()
            .ok_or_else(|| LedgerError::Rejected("empty group".to_string()))?;
        if group.len() > 1 {
            let id = first.txn.group;
            if id.is_none() || group.iter().any(|stxn| stxn.txn.group != id) {
                return Err(LedgerError::Rejected("transactions are not grouped".to_string()));
            }
        }

        let mut accounts = state.accounts.clone();
        for stxn in group {
            apply(&mut accounts, stxn)?;
        }
        state.accounts = accounts;
        state.round += 1;

        let confirmed = state.queued_confirmations.pop_front().unwrap_or_default();
        for stxn in group {
            let tx_id = stxn.txn.id_hex();
            let round = state.round;
            state.confirmations.insert(
                tx_id.clone(),
                ConfirmedTransaction {
                    tx_id,
                    confirmed_round: round,
                    ..confirmed.clone()
                },
            );
        }
        state.groups.push(group.to_vec());

        Ok(first.txn.id_hex())
    }

    async fn wait_for_confirmation(&self, tx_id: &str, max_rounds: u64) -> LedgerResult<ConfirmedTransaction> {
        let state = self.state.read().await;
        if state.withhold_confirmations {
            return Err(LedgerError::Timeout {
                tx_id: tx_id.to_string(),
                rounds: max_rounds,
            });
        }
        state
            .confirmations
            .get(tx_id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn search_transactions(
        &self,
        query: &TransactionQuery,
        next_token: Option<&str>,
    ) -> LedgerResult<TransactionPage> {
        let mut state = self.state.write().await;
        state
            .queries
            .push((query.clone(), next_token.map(str::to_string)));

        let round = state.round;
        Ok(state.search_pages.pop_front().unwrap_or(TransactionPage {
            transactions: Vec::new(),
            next_token: None,
            current_round: round,
        }))
    }
}
