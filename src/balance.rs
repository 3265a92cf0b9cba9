use super::contract::PostsContract;
use super::state::AppState;
use super::types::{Balance, SigningIdentity, ERC20_DECIMALS};
use super::wallet::ChainHandle;
use anyhow::{anyhow, bail};
use ethers_core::types::U256;
use ethers_core::utils::parse_units;
use log::{debug, error};
use std::sync::Arc;
use tokio::sync::OnceCell;

const DISPLAY_DECIMALS: u32 = 2;

/// Rescales a base-unit amount to a display string with exactly two
/// fractional digits, rounding half up.
pub fn format_balance(amount: U256) -> Balance {
    let unit = U256::exp10((ERC20_DECIMALS - DISPLAY_DECIMALS) as usize);
    let (mut cents, remainder) = amount.div_mod(unit);
    if remainder * 2 >= unit {
        cents += U256::one();
    }
    let (whole, fraction) = cents.div_mod(U256::from(100));
    Balance(format!("{}.{:02}", whole, fraction.as_u64()))
}

/// Parses a decimal token amount typed by the user into base units.
pub fn parse_token_amount(amount: &str) -> anyhow::Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() || amount.starts_with('-') {
        bail!("invalid token amount '{}'", amount);
    }
    let parsed = parse_units(amount, ERC20_DECIMALS)
        .map_err(|e| anyhow!("invalid token amount '{}': {}", amount, e))?;
    Ok(parsed.into())
}

/// Keeps the displayed balance current and binds the contract handle on the
/// first successful read.
pub struct BalanceReader {
    identity: SigningIdentity,
    chain: Arc<dyn ChainHandle>,
    state: AppState,
    contract: OnceCell<Arc<dyn PostsContract>>,
}

impl BalanceReader {
    pub fn new(identity: SigningIdentity, chain: Arc<dyn ChainHandle>, state: AppState) -> Self {
        Self {
            identity,
            chain,
            state,
            contract: OnceCell::new(),
        }
    }

    pub fn contract(&self) -> Option<Arc<dyn PostsContract>> {
        self.contract.get().cloned()
    }

    /// Failures are only logged, the last balance stays on display.
    /// Returns the contract handle once it is bound.
    pub async fn refresh(&self) -> Option<Arc<dyn PostsContract>> {
        match self.read().await {
            Ok(balance) => {
                debug!("(balance) {:?} holds {}", self.identity, balance);
                self.state.set_balance(balance);
            }
            Err(e) => {
                error!("(balance) refresh failed with error {:?}", e);
            }
        }
        self.contract()
    }

    async fn read(&self) -> anyhow::Result<Balance> {
        let amount = self.chain.total_balance(self.identity).await?;
        let balance = format_balance(amount);
        self.contract
            .get_or_try_init(|| async { self.chain.bind_contract() })
            .await?;
        Ok(balance)
    }
}
