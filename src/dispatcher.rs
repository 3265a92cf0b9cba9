use super::balance::{format_balance, BalanceReader};
use super::contract::{PostsContract, StableToken};
use super::feed::FeedLoader;
use super::notify::Notifier;
use super::storage::{AllowanceStore, PendingAllowance, TipStage};
use super::types::SigningIdentity;
use anyhow::Context;
use ethers_core::types::U256;
use log::{error, info, warn};
use std::future::Future;
use std::sync::Arc;

pub const TIP_SENT: &str = "you have successfully sent cUSD to this user";

/// Submits mutating calls signed by the session identity and refreshes
/// whatever they change.
pub struct ActionDispatcher {
    identity: SigningIdentity,
    contract: Arc<dyn PostsContract>,
    token: Arc<dyn StableToken>,
    feed: Arc<FeedLoader>,
    balance: Arc<BalanceReader>,
    ledger: Arc<dyn AllowanceStore>,
    notifier: Arc<dyn Notifier>,
}

impl ActionDispatcher {
    pub fn new(
        identity: SigningIdentity,
        contract: Arc<dyn PostsContract>,
        token: Arc<dyn StableToken>,
        feed: Arc<FeedLoader>,
        balance: Arc<BalanceReader>,
        ledger: Arc<dyn AllowanceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            identity,
            contract,
            token,
            feed,
            balance,
            ledger,
            notifier,
        }
    }

    pub async fn add_post(
        &self,
        image: String,
        title: String,
        description: String,
    ) -> anyhow::Result<()> {
        self.confirm("newPost", self.contract.new_post(image, title, description))
            .await?;
        self.refresh_feed().await;
        Ok(())
    }

    pub async fn add_comment(&self, index: u64, description: String) -> anyhow::Result<()> {
        self.confirm(
            "addComment",
            self.contract.add_comment(U256::from(index), description),
        )
        .await?;
        self.refresh_feed().await;
        Ok(())
    }

    pub async fn like_post(&self, index: u64) -> anyhow::Result<()> {
        self.confirm("likePost", self.contract.like_post(U256::from(index)))
            .await?;
        self.refresh_feed().await;
        Ok(())
    }

    /// Grants the application contract an allowance of `amount` base units,
    /// then tips the author of post `index`.
    ///
    /// The two steps are not atomic. The allowance is recorded in the ledger
    /// before it is requested and removed once the tip is confirmed. When the
    /// tip fails the allowance stays granted and recorded, nothing is rolled
    /// back or retried, and `revoke_allowance` cancels it.
    pub async fn send_tip(&self, index: u64, amount: U256) -> anyhow::Result<()> {
        let mut pending = PendingAllowance {
            post_index: index,
            owner: self.identity,
            spender: self.contract.address(),
            amount,
            stage: TipStage::Approving,
        };
        self.confirm("sendTip", self.commit_tip(&mut pending)).await?;

        // the tip is on chain already, failing here would misreport it
        if let Err(e) = self.ledger.remove_allowance(&pending.owner, &pending.spender) {
            warn!(
                "(tip) tip confirmed but the allowance record stays, error {:?}",
                e
            );
        }
        self.refresh_feed().await;
        self.balance.refresh().await;
        self.notifier.notify(TIP_SENT);
        Ok(())
    }

    async fn commit_tip(&self, pending: &mut PendingAllowance) -> anyhow::Result<()> {
        self.ledger.store_allowance(pending)?;

        if let Err(e) = self.token.approve(pending.spender, pending.amount).await {
            if let Err(le) = self.ledger.remove_allowance(&pending.owner, &pending.spender) {
                warn!("(tip) failed to clear allowance record with error {:?}", le);
            }
            return Err(e.context("allowance grant failed"));
        }

        pending.stage = TipStage::Approved;
        self.ledger.store_allowance(pending)?;

        self.contract
            .send_tip(U256::from(pending.post_index), pending.amount)
            .await
            .with_context(|| {
                format!(
                    "tip failed, the allowance of {} cUSD is still granted",
                    format_balance(pending.amount)
                )
            })
    }

    /// Allowance left behind by a failed tip, if any.
    pub fn pending_allowance(&self) -> anyhow::Result<Option<PendingAllowance>> {
        self.ledger
            .find_allowance(&self.identity, &self.contract.address())
    }

    /// Cancels an allowance left behind by a failed tip by approving zero.
    pub async fn revoke_allowance(&self) -> anyhow::Result<()> {
        let spender = self.contract.address();
        if self.pending_allowance()?.is_none() {
            self.notifier.notify("no pending allowance");
            return Ok(());
        }

        self.confirm("approve", self.token.approve(spender, U256::zero()))
            .await?;
        self.ledger.remove_allowance(&self.identity, &spender)?;
        self.notifier.notify("allowance revoked");
        Ok(())
    }

    async fn confirm(
        &self,
        action: &str,
        call: impl Future<Output = anyhow::Result<()>>,
    ) -> anyhow::Result<()> {
        match call.await {
            Ok(()) => {
                info!("(dispatch) {} confirmed for {:?}", action, self.identity);
                Ok(())
            }
            Err(e) => {
                error!("(dispatch) {} failed with error {:?}", action, e);
                self.notifier.alert(&format!("{:#}", e));
                Err(e)
            }
        }
    }

    async fn refresh_feed(&self) {
        // failures are logged by the loader, the old feed stays
        let _ = self.feed.refresh().await;
    }
}
