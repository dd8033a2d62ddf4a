use crate::config::FundingConfig;

/// Each verification group pays at least this many verification costs.
pub const VERIFICATIONS_PER_TOP_UP: u64 = 3;

/// Keeps the shared verifier account near `wallet_buffer`.
///
/// A caller normally pays `3 * cost_per_verification`. When the account has
/// fallen at least that far below the buffer, the caller refills it to the
/// buffer instead, which covers whatever earlier callers under-paid during
/// congestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingPolicy {
    pub wallet_buffer: u64,
    pub cost_per_verification: u64,
}

impl FundingPolicy {
    pub fn top_up(&self, balance: u64) -> u64 {
        let required = VERIFICATIONS_PER_TOP_UP * self.cost_per_verification;
        let shortfall = self.wallet_buffer.saturating_sub(balance);
        if shortfall >= required {
            shortfall
        } else {
            required
        }
    }
}

impl From<FundingConfig> for FundingPolicy {
    fn from(config: FundingConfig) -> Self {
        Self {
            wallet_buffer: config.wallet_buffer,
            cost_per_verification: config.cost_per_verification,
        }
    }
}
