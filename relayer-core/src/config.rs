use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RelayerConfig {
    pub core_app_id: u64,
    pub token_bridge_app_id: u64,
    /// Chain id of the destination ledger itself.
    pub home_chain: u16,
    pub seed_amount: u64,
    pub max_sigs_per_txn: usize,
    pub max_group_size: usize,
    pub confirmation_rounds: u64,
    pub asset_optin_rounds: u64,
    pub attest_top_up: u64,
    pub asset_optin_funding: u64,
    #[serde(default)]
    pub preflight_signatures: bool,
    pub funding: FundingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingConfig {
    pub wallet_buffer: u64,
    pub cost_per_verification: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 30,
            backoff_ms: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct ConfigFile {
    relayer: RelayerConfig,
}

impl RelayerConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(content)?;
        Ok(config.relayer)
    }

    pub fn default_test_config() -> Self {
        Self {
            core_app_id: 4,
            token_bridge_app_id: 6,
            home_chain: 8,
            seed_amount: 1_002_000,
            max_sigs_per_txn: 9,
            max_group_size: 16,
            confirmation_rounds: 1,
            asset_optin_rounds: 4,
            attest_top_up: 100_000,
            asset_optin_funding: 100_000,
            preflight_signatures: false,
            funding: FundingConfig {
                wallet_buffer: 200_000,
                cost_per_verification: 1_000,
            },
            fetch: FetchConfig {
                attempts: 3,
                backoff_ms: 1,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            preflight_signatures: true,
            fetch: FetchConfig::default(),
            ..Self::default_test_config()
        }
    }
}
