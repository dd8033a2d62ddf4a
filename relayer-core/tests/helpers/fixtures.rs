use relayer_core::codec::{CORE_MODULE, TOKEN_BRIDGE_MODULE};
use relayer_core::registry::{encode_local_state, participation_program};
use relayer_core::signer::Signer;
use relayer_core::utils::keccak256;
use relayer_core::{
    Address, Authorization, GuardianSet, MockLedger, RelayerConfig, Relayer, SignedTransaction,
    Transaction, TransactionSigner,
};

pub const TEST_GUARDIAN_KEYS: [&str; 19] = [
    "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d",
    "0x6cbed15c793ce57650b9877cf6fa156fbef513c4e6134f022a85b1ffdd59b2a1",
    "0x6370fd033278c143179d81c5526140625662b8daa446c22ee2d73db3707e620c",
    "0x646f1ce2fdad0e6deeeb5c7e8e5543bdde65e86029e2fd9fc169899c440a7913",
    "0xadd53f9a7e588d003326d1cbf9e4a43c061aadd9bc938c843a79e7b4fd2ad743",
    "0x395df67f0c2d2d9fe1ad08d1bc8b6627011959b79c53d7dd6a3536a33ab8a4fd",
    "0xe485d098507f54e7733a205420dfddbe58db035fa577fc294ebd14db90767a52",
    "0xa453611d9419d0e56f499079478fd72c37b251a94bfde4d19872c44cf65386e3",
    "0x829e924fdf021ba3dbbc4225edfece9aca04b929d6e75613329ca6f1d31c0bb4",
    "0xb0057716d5917badaf911b193b12b910811c1497b5bada8d7711f758981c3773",
    "0x77c5495fbb039eed474fc940f29955ed0531693cc9212911efd35dff0373153f",
    "0xd99b5b29e6da2528bf458b26237a6cf8655a3e3276c1cdc0de1f98cefee81c01",
    "0x9b9c613a36396172eab2d34d72331c8ca83a358781883a535d2941f66db07b24",
    "0x0874049f95d55fb76916262dc70571701b5c4cc5900c0691af75f1a8a52c8268",
    "0x21d7212f3b4e5332fd465877b64926e3532653e2798a11255a46f533852dfe46",
    "0x47b65e1d4c0b09bb8bd88c6b23af8c47c8c3f3d3e1a5dc0c8a2ec8d9a1e1cf1a",
    "0x3c45b8a3d9b4c7e6f1a2d5c8b7e9f0a3c6d9e2f5a8b1c4d7e0f3a6b9c2d5e8f1",
    "0x1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b",
    "0x9e8d7c6b5a4f3e2d1c0b9a8f7e6d5c4b3a2f1e0d9c8b7a6f5e4d3c2b1a0f9e8d",
];

pub const WALLET_FUNDS: u64 = 1_000_000_000;
pub const FOREIGN_CHAIN: u16 = 2;
pub const FOREIGN_EMITTER: [u8; 32] = [0x74; 32];
pub const FOREIGN_TOKEN: [u8; 32] = [0xee; 32];

/// Relayer key that "signs" by hashing; the mock ledger only checks who signed.
#[derive(Debug, Clone)]
pub struct TestWallet {
    address: Address,
}

impl TestWallet {
    pub fn new(name: &str) -> Self {
        Self {
            address: Address(keccak256(name.as_bytes())),
        }
    }
}

impl TransactionSigner for TestWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_transaction(&self, txn: Transaction) -> relayer_core::Result<SignedTransaction> {
        let signature = keccak256(&txn.id()).to_vec();
        Ok(SignedTransaction {
            txn,
            authorization: Authorization::Key {
                signer: self.address,
                signature,
            },
        })
    }
}

pub fn create_test_guardian_set(index: u32, count: usize) -> GuardianSet {
    GuardianSet {
        index,
        keys: TEST_GUARDIAN_KEYS[..count]
            .iter()
            .map(|key| Signer::new(key).unwrap().get_address())
            .collect(),
    }
}

pub fn guardian_account(config: &RelayerConfig, index: u32) -> Address {
    participation_program(config.seed_amount, config.core_app_id, u64::from(index), b"guardian").address
}

pub fn chain_account(config: &RelayerConfig, chain: u16, contract: &[u8; 32]) -> Address {
    participation_program(
        config.seed_amount,
        config.token_bridge_app_id,
        u64::from(chain),
        contract,
    )
    .address
}

/// Publishes a guardian set's key table the way the core app stores it.
pub async fn install_guardian_set(ledger: &MockLedger, config: &RelayerConfig, set: &GuardianSet) {
    let address = guardian_account(config, set.index);
    ledger
        .set_local_state(address, config.core_app_id, encode_local_state(&set.to_local_state()))
        .await;
    ledger
        .set_auth_addr(address, Address::for_application(config.core_app_id))
        .await;
}

/// Records `asset_id` as the wrapped asset behind a foreign token.
pub async fn install_wrapped_asset(
    ledger: &MockLedger,
    config: &RelayerConfig,
    chain: u16,
    contract: &[u8; 32],
    asset_id: u64,
) -> Address {
    let address = chain_account(config, chain, contract);
    ledger
        .set_local_state(
            address,
            config.token_bridge_app_id,
            encode_local_state(&asset_id.to_be_bytes()),
        )
        .await;
    address
}

pub async fn setup_relayer_with(config: RelayerConfig) -> (MockLedger, Relayer<MockLedger, TestWallet>) {
    let ledger = MockLedger::new();
    let wallet = TestWallet::new("relayer");
    ledger.fund(wallet.address(), WALLET_FUNDS).await;
    install_guardian_set(&ledger, &config, &create_test_guardian_set(0, 19)).await;

    let relayer = Relayer::new(ledger.clone(), wallet, config);
    (ledger, relayer)
}

pub async fn setup_relayer() -> (MockLedger, Relayer<MockLedger, TestWallet>) {
    setup_relayer_with(RelayerConfig::default_test_config()).await
}

pub fn core_guardian_set_upgrade_payload(new_index: u32) -> Vec<u8> {
    let mut payload = CORE_MODULE.to_vec();
    payload.push(2);
    payload.extend_from_slice(&0u16.to_be_bytes());
    payload.extend_from_slice(&new_index.to_be_bytes());
    payload
}

pub fn register_chain_payload(emitter_chain: u16, emitter: [u8; 32]) -> Vec<u8> {
    let mut payload = TOKEN_BRIDGE_MODULE.to_vec();
    payload.push(1);
    payload.extend_from_slice(&0u16.to_be_bytes());
    payload.extend_from_slice(&emitter_chain.to_be_bytes());
    payload.extend_from_slice(&emitter);
    payload
}

pub fn attest_payload(contract: [u8; 32], from_chain: u16, decimals: u8) -> Vec<u8> {
    let mut payload = vec![2];
    payload.extend_from_slice(&contract);
    payload.extend_from_slice(&from_chain.to_be_bytes());
    payload.push(decimals);
    payload.extend_from_slice(&relayer_core::utils::to_32_bytes(b"TKN"));
    payload.extend_from_slice(&relayer_core::utils::to_32_bytes(b"Token"));
    payload
}

fn transfer_body(
    payload_type: u8,
    amount: u64,
    contract: [u8; 32],
    from_chain: u16,
    to_address: [u8; 32],
    to_chain: u16,
    fee: u64,
) -> Vec<u8> {
    let mut payload = vec![payload_type];
    payload.extend_from_slice(&relayer_core::utils::to_32_bytes(&amount.to_be_bytes()));
    payload.extend_from_slice(&contract);
    payload.extend_from_slice(&from_chain.to_be_bytes());
    payload.extend_from_slice(&to_address);
    payload.extend_from_slice(&to_chain.to_be_bytes());
    payload.extend_from_slice(&relayer_core::utils::to_32_bytes(&fee.to_be_bytes()));
    payload
}

pub fn transfer_payload(contract: [u8; 32], from_chain: u16, to_address: [u8; 32], fee: u64) -> Vec<u8> {
    transfer_body(1, 1_000, contract, from_chain, to_address, 8, fee)
}

pub fn transfer_with_payload(
    contract: [u8; 32],
    from_chain: u16,
    to_address: [u8; 32],
    extra: &[u8],
) -> Vec<u8> {
    let mut payload = transfer_body(3, 1_000, contract, from_chain, to_address, 8, 0);
    payload.extend_from_slice(extra);
    payload
}

/// Contract field of a token native to the home chain: asset id in the
/// leading bytes.
pub fn native_contract(asset_id: u64) -> [u8; 32] {
    let mut contract = [0u8; 32];
    contract[..8].copy_from_slice(&asset_id.to_be_bytes());
    contract
}
