use super::contract::PostsContract;
use super::state::AppState;
use super::storage::Ledger;
use super::types::Post;
use anyhow::{anyhow, Context};
use ethers_core::types::U256;
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, error, warn};
use std::sync::Arc;

pub const DEFAULT_FEED_CONCURRENCY: usize = 16;

/// Reads every post of the contract. At most `concurrency` reads are in
/// flight, the result is ordered by index and any failed read fails the
/// whole load.
pub async fn load_feed(
    contract: &dyn PostsContract,
    concurrency: usize,
) -> anyhow::Result<Vec<Post>> {
    let length = contract.posts_length().await?;
    if length.bits() > 64 {
        return Err(anyhow!("post count {} out of range", length));
    }
    let length = length.as_u64();

    stream::iter(0..length)
        .map(move |index| async move {
            let record = contract
                .get_post(U256::from(index))
                .await
                .with_context(|| format!("failed to read post {}", index))?;
            Ok::<_, anyhow::Error>(Post::from_record(index, record))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

pub struct FeedLoader {
    contract: Arc<dyn PostsContract>,
    state: AppState,
    concurrency: usize,
    ledger: Option<Ledger>,
}

impl FeedLoader {
    pub fn new(
        contract: Arc<dyn PostsContract>,
        state: AppState,
        concurrency: usize,
        ledger: Option<Ledger>,
    ) -> Self {
        Self {
            contract,
            state,
            concurrency,
            ledger,
        }
    }

    /// Replaces the published feed. On failure the previous feed stays.
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let generation = self.state.begin_feed_refresh();
        let feed = match load_feed(self.contract.as_ref(), self.concurrency).await {
            Ok(feed) => feed,
            Err(e) => {
                error!("(feed) refresh {} failed with error {:?}", generation, e);
                return Err(e);
            }
        };

        if !self.state.publish_feed(generation, feed) {
            debug!("(feed) dropped refresh {}, a newer one already published", generation);
            return Ok(());
        }
        debug!("(feed) published refresh {}", generation);

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.store_feed(&self.state.snapshot().feed) {
                warn!("(feed) failed to cache feed with error {:?}", e);
            }
        }
        Ok(())
    }
}
