use super::types::{Comment, PostRecord};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::signers::LocalWallet;
use ethers_contract::{Contract, ContractCall};
use ethers_core::abi::{Abi, Detokenize};
use ethers_core::types::{Address, U256, U64};
use ethers_providers::{Http, Provider};
use log::debug;
use std::sync::Arc;

const CELOGRAM_ABI: &str = include_str!("../abi/celogram.json");
const IERC20_ABI: &str = include_str!("../abi/ierc20.json");

/// Provider plus signer every contract call goes through
pub type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Typed handle to the Celogram application contract.
#[async_trait]
pub trait PostsContract: Send + Sync {
    fn address(&self) -> Address;

    async fn posts_length(&self) -> anyhow::Result<U256>;

    async fn get_post(&self, index: U256) -> anyhow::Result<PostRecord>;

    async fn new_post(
        &self,
        image: String,
        title: String,
        description: String,
    ) -> anyhow::Result<()>;

    async fn add_comment(&self, index: U256, description: String) -> anyhow::Result<()>;

    async fn like_post(&self, index: U256) -> anyhow::Result<()>;

    /// Moves `amount` of the stable token from the caller to the post author.
    /// Requires a prior allowance for the application contract.
    async fn send_tip(&self, index: U256, amount: U256) -> anyhow::Result<()>;
}

/// The part of the ERC20 interface the client needs.
#[async_trait]
pub trait StableToken: Send + Sync {
    async fn balance_of(&self, owner: Address) -> anyhow::Result<U256>;

    async fn approve(&self, spender: Address, amount: U256) -> anyhow::Result<()>;
}

pub fn celogram_abi() -> anyhow::Result<Abi> {
    serde_json::from_str(CELOGRAM_ABI).context("invalid celogram abi")
}

pub fn ierc20_abi() -> anyhow::Result<Abi> {
    serde_json::from_str(IERC20_ABI).context("invalid erc20 abi")
}

/// Sends the transaction and waits for a successful receipt.
async fn submit<D: Detokenize>(call: ContractCall<Client, D>) -> anyhow::Result<()> {
    let pending = call.send().await?;
    let tx_hash = *pending;
    debug!("(contract) submitted tx {:?}", tx_hash);

    let receipt = pending
        .await?
        .ok_or_else(|| anyhow!("transaction {:?} was dropped", tx_hash))?;
    if receipt.status == Some(U64::zero()) {
        bail!("transaction {:?} reverted", tx_hash);
    }
    Ok(())
}

pub struct EthersPostsContract {
    contract: Contract<Client>,
}

impl EthersPostsContract {
    pub fn new(address: Address, abi: Abi, client: Arc<Client>) -> Self {
        Self {
            contract: Contract::new(address, abi, client),
        }
    }
}

#[async_trait]
impl PostsContract for EthersPostsContract {
    fn address(&self) -> Address {
        self.contract.address()
    }

    async fn posts_length(&self) -> anyhow::Result<U256> {
        let length = self
            .contract
            .method::<_, U256>("getPostsLength", ())?
            .call()
            .await?;
        Ok(length)
    }

    async fn get_post(&self, index: U256) -> anyhow::Result<PostRecord> {
        let (author, image, title, description, likes, comments) = self
            .contract
            .method::<_, (Address, String, String, String, U256, Vec<(String,)>)>(
                "getPost", index,
            )?
            .call()
            .await?;

        Ok(PostRecord {
            author,
            image,
            title,
            description,
            likes,
            comments: comments
                .into_iter()
                .map(|(description,)| Comment { description })
                .collect(),
        })
    }

    async fn new_post(
        &self,
        image: String,
        title: String,
        description: String,
    ) -> anyhow::Result<()> {
        submit(
            self.contract
                .method::<_, ()>("newPost", (image, title, description))?,
        )
        .await
    }

    async fn add_comment(&self, index: U256, description: String) -> anyhow::Result<()> {
        submit(
            self.contract
                .method::<_, ()>("addComment", (index, description))?,
        )
        .await
    }

    async fn like_post(&self, index: U256) -> anyhow::Result<()> {
        submit(self.contract.method::<_, ()>("likePost", index)?).await
    }

    async fn send_tip(&self, index: U256, amount: U256) -> anyhow::Result<()> {
        submit(self.contract.method::<_, ()>("sendTip", (index, amount))?).await
    }
}

pub struct EthersStableToken {
    contract: Contract<Client>,
}

impl EthersStableToken {
    pub fn new(address: Address, abi: Abi, client: Arc<Client>) -> Self {
        Self {
            contract: Contract::new(address, abi, client),
        }
    }
}

#[async_trait]
impl StableToken for EthersStableToken {
    async fn balance_of(&self, owner: Address) -> anyhow::Result<U256> {
        let balance = self
            .contract
            .method::<_, U256>("balanceOf", owner)?
            .call()
            .await?;
        Ok(balance)
    }

    async fn approve(&self, spender: Address, amount: U256) -> anyhow::Result<()> {
        submit(
            self.contract
                .method::<_, bool>("approve", (spender, amount))?,
        )
        .await
    }
}
