use super::contract::{
    celogram_abi, ierc20_abi, Client, EthersPostsContract, EthersStableToken, PostsContract,
    StableToken,
};
use super::notify::Notifier;
use super::types::{SigningIdentity, APP_CONTRACT, STABLE_TOKEN};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::signers::{LocalWallet, Signer};
use ethers_core::abi::Abi;
use ethers_core::types::{Address, U256};
use ethers_providers::{Http, Middleware, Provider};
use log::{error, info};
use std::sync::Arc;

/// Source of accounts and of the chain capability bound to one of them.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Requests account access. The first account is the one to sign with.
    async fn enable(&self) -> anyhow::Result<Vec<Address>>;

    fn chain(&self, identity: SigningIdentity) -> anyhow::Result<Arc<dyn ChainHandle>>;
}

/// Everything the client does against the chain once an identity is known.
#[async_trait]
pub trait ChainHandle: Send + Sync {
    /// Stable token balance of `owner` in base units
    async fn total_balance(&self, owner: Address) -> anyhow::Result<U256>;

    fn bind_contract(&self) -> anyhow::Result<Arc<dyn PostsContract>>;

    fn stable_token(&self) -> anyhow::Result<Arc<dyn StableToken>>;
}

/// Identity plus chain handle, fixed for the session.
#[derive(Clone)]
pub struct Session {
    pub identity: SigningIdentity,
    pub chain: Arc<dyn ChainHandle>,
}

/// Connects once. On failure the user gets an alert and there is no session,
/// nothing is retried.
pub async fn connect_to_wallet(
    provider: Option<&dyn WalletProvider>,
    notifier: &dyn Notifier,
) -> Option<Session> {
    let provider = match provider {
        Some(p) => p,
        None => {
            error!("(wallet) no wallet provider configured");
            notifier.alert("Error Occurred: no wallet provider available");
            return None;
        }
    };

    let session = async {
        let accounts = provider.enable().await?;
        let identity = *accounts
            .first()
            .ok_or_else(|| anyhow!("wallet returned no accounts"))?;
        let chain = provider.chain(identity)?;
        Ok::<_, anyhow::Error>(Session { identity, chain })
    }
    .await;

    match session {
        Ok(session) => {
            info!("(wallet) connected as {:?}", session.identity);
            Some(session)
        }
        Err(e) => {
            error!("(wallet) connection failed with error {:?}", e);
            notifier.alert(&format!("{:#}", e));
            None
        }
    }
}

/// JSON-RPC endpoint plus a local signing key.
pub struct EthersWallet {
    provider: Provider<Http>,
    wallet: LocalWallet,
}

impl EthersWallet {
    pub fn new(rpc_url: &str, private_key: &str, chain_id: u64) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        let wallet = private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()?
            .with_chain_id(chain_id);
        Ok(Self { provider, wallet })
    }
}

#[async_trait]
impl WalletProvider for EthersWallet {
    async fn enable(&self) -> anyhow::Result<Vec<Address>> {
        let remote_chain_id = self.provider.get_chainid().await?;
        if remote_chain_id != U256::from(self.wallet.chain_id()) {
            bail!(
                "endpoint is on chain {} but the wallet is configured for chain {}",
                remote_chain_id,
                self.wallet.chain_id()
            );
        }
        Ok(vec![self.wallet.address()])
    }

    fn chain(&self, identity: SigningIdentity) -> anyhow::Result<Arc<dyn ChainHandle>> {
        if identity != self.wallet.address() {
            bail!("wallet does not hold a key for {:?}", identity);
        }
        let client = SignerMiddleware::new(self.provider.clone(), self.wallet.clone());
        Ok(Arc::new(EthersChain {
            client: Arc::new(client),
            celogram: celogram_abi()?,
            erc20: ierc20_abi()?,
        }))
    }
}

pub struct EthersChain {
    client: Arc<Client>,
    celogram: Abi,
    erc20: Abi,
}

#[async_trait]
impl ChainHandle for EthersChain {
    async fn total_balance(&self, owner: Address) -> anyhow::Result<U256> {
        self.stable_token()?.balance_of(owner).await
    }

    fn bind_contract(&self) -> anyhow::Result<Arc<dyn PostsContract>> {
        Ok(Arc::new(EthersPostsContract::new(
            APP_CONTRACT,
            self.celogram.clone(),
            self.client.clone(),
        )))
    }

    fn stable_token(&self) -> anyhow::Result<Arc<dyn StableToken>> {
        Ok(Arc::new(EthersStableToken::new(
            STABLE_TOKEN,
            self.erc20.clone(),
            self.client.clone(),
        )))
    }
}
