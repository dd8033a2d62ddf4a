use crate::error::Result;
use crate::ledger::SuggestedParams;
use crate::template::LogicProgram;
use crate::types::Address;
use crate::utils::sha512_256;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnComplete {
    NoOp,
    OptIn,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    Payment {
        receiver: Address,
        amount: u64,
    },
    AssetTransfer {
        asset_id: u64,
        receiver: Address,
        amount: u64,
    },
    ApplicationCall {
        app_id: u64,
        on_complete: OnComplete,
        args: Vec<Vec<u8>>,
        accounts: Vec<Address>,
        foreign_apps: Vec<u64>,
        foreign_assets: Vec<u64>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_hash: [u8; 32],
    pub group: Option<[u8; 32]>,
    pub rekey_to: Option<Address>,
    pub kind: TransactionKind,
}

impl Transaction {
    fn new(sender: Address, params: &SuggestedParams, kind: TransactionKind) -> Self {
        Self {
            sender,
            fee: params.fee.max(params.min_fee),
            first_valid: params.first_valid,
            last_valid: params.last_valid,
            genesis_hash: params.genesis_hash,
            group: None,
            rekey_to: None,
            kind,
        }
    }

    pub fn payment(sender: Address, receiver: Address, amount: u64, params: &SuggestedParams) -> Self {
        Self::new(sender, params, TransactionKind::Payment { receiver, amount })
    }

    /// Zero-amount self payment handing signing authority to `auth`.
    pub fn rekey(account: Address, auth: Address, params: &SuggestedParams) -> Self {
        let mut txn = Self::payment(account, account, 0, params);
        txn.rekey_to = Some(auth);
        txn
    }

    pub fn asset_transfer(
        sender: Address,
        receiver: Address,
        asset_id: u64,
        amount: u64,
        params: &SuggestedParams,
    ) -> Self {
        Self::new(
            sender,
            params,
            TransactionKind::AssetTransfer { asset_id, receiver, amount },
        )
    }

    pub fn app_call(sender: Address, app_id: u64, params: &SuggestedParams) -> AppCallBuilder {
        AppCallBuilder {
            sender,
            app_id,
            on_complete: OnComplete::NoOp,
            args: Vec::new(),
            accounts: Vec::new(),
            foreign_apps: Vec::new(),
            foreign_assets: Vec::new(),
            params: params.clone(),
        }
    }

    pub fn app_optin(sender: Address, app_id: u64, params: &SuggestedParams) -> Self {
        Self::app_call(sender, app_id, params)
            .on_complete(OnComplete::OptIn)
            .build()
    }

    /// First application argument, the method selector by convention.
    pub fn method(&self) -> Option<&[u8]> {
        match &self.kind {
            TransactionKind::ApplicationCall { args, .. } => args.first().map(Vec::as_slice),
            _ => None,
        }
    }

    pub fn id(&self) -> [u8; 32] {
        sha512_256(b"TX", &bincode::serialize(self).unwrap_or_default())
    }

    pub fn id_hex(&self) -> String {
        hex::encode(self.id())
    }
}

pub struct AppCallBuilder {
    sender: Address,
    app_id: u64,
    on_complete: OnComplete,
    args: Vec<Vec<u8>>,
    accounts: Vec<Address>,
    foreign_apps: Vec<u64>,
    foreign_assets: Vec<u64>,
    params: SuggestedParams,
}

impl AppCallBuilder {
    pub fn on_complete(mut self, on_complete: OnComplete) -> Self {
        self.on_complete = on_complete;
        self
    }

    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn accounts(mut self, accounts: &[Address]) -> Self {
        self.accounts = accounts.to_vec();
        self
    }

    pub fn foreign_apps(mut self, apps: &[u64]) -> Self {
        self.foreign_apps = apps.to_vec();
        self
    }

    pub fn foreign_assets(mut self, assets: &[u64]) -> Self {
        self.foreign_assets = assets.to_vec();
        self
    }

    pub fn build(self) -> Transaction {
        Transaction::new(
            self.sender,
            &self.params,
            TransactionKind::ApplicationCall {
                app_id: self.app_id,
                on_complete: self.on_complete,
                args: self.args,
                accounts: self.accounts,
                foreign_apps: self.foreign_apps,
                foreign_assets: self.foreign_assets,
            },
        )
    }
}

/// Stamps every transaction with the group id derived from their ids in order.
pub fn assign_group_id(txns: &mut [Transaction]) -> [u8; 32] {
    for txn in txns.iter_mut() {
        txn.group = None;
    }

    let mut ids = Vec::with_capacity(txns.len() * 32);
    for txn in txns.iter() {
        ids.extend_from_slice(&txn.id());
    }
    let group = sha512_256(b"TG", &ids);

    for txn in txns.iter_mut() {
        txn.group = Some(group);
    }
    group
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Key { signer: Address, signature: Vec<u8> },
    Program { program: Vec<u8> },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub txn: Transaction,
    pub authorization: Authorization,
}

impl SignedTransaction {
    pub fn with_program(txn: Transaction, program: &LogicProgram) -> Self {
        Self {
            txn,
            authorization: Authorization::Program {
                program: program.bytes.clone(),
            },
        }
    }

    /// Address whose authority signed this transaction.
    pub fn authorizer(&self) -> Address {
        match &self.authorization {
            Authorization::Key { signer, .. } => *signer,
            Authorization::Program { program } => Address::for_program(program),
        }
    }
}

/// Key-holding account that pays for and authorizes relayer transactions.
/// Custody of the key is left to the implementor.
pub trait TransactionSigner {
    fn address(&self) -> Address;

    fn sign_transaction(&self, txn: Transaction) -> Result<SignedTransaction>;
}
