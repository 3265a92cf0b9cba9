use super::types::Post;
use anyhow::anyhow;
use ethers_core::types::{Address, U256};
use rocksdb::{IteratorMode, DB};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

const FEED_KEY: &[u8] = b"last-feed";

/// How far a tip got before the process stopped looking at it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipStage {
    /// `approve` submitted, no confirmation yet
    Approving,
    /// Allowance granted, `sendTip` not confirmed
    Approved,
}

/// Allowance granted (or being granted) to the application contract that
/// no confirmed tip has consumed yet. There is at most one per owner and
/// spender, a new `approve` replaces the previous allowance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PendingAllowance {
    /// Post of the tip that requested the allowance
    pub post_index: u64,
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
    pub stage: TipStage,
}

/// Where pending allowances are remembered between runs.
pub trait AllowanceStore: Send + Sync {
    fn store_allowance(&self, allowance: &PendingAllowance) -> anyhow::Result<()>;

    fn find_allowance(
        &self,
        owner: &Address,
        spender: &Address,
    ) -> anyhow::Result<Option<PendingAllowance>>;

    fn remove_allowance(&self, owner: &Address, spender: &Address) -> anyhow::Result<()>;

    /// Every pending allowance of every owner.
    fn pending_allowances(&self) -> anyhow::Result<Vec<PendingAllowance>>;
}

#[derive(Clone)]
pub struct Ledger {
    /// Pending allowances keyed by owner and spender address
    allowances: Arc<Mutex<DB>>,
    /// Last published feed, shown before the first refresh of a run
    cache: Arc<Mutex<DB>>,
}

fn allowance_key(owner: &Address, spender: &Address) -> Vec<u8> {
    [owner.as_bytes(), spender.as_bytes()].concat()
}

fn lock(db: &Mutex<DB>) -> anyhow::Result<MutexGuard<'_, DB>> {
    db.lock().map_err(|_| anyhow!("ledger lock poisoned"))
}

impl Ledger {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let allowances = DB::open_default(root.join("allowances"))?;
        let cache = DB::open_default(root.join("cache"))?;
        Ok(Self {
            allowances: Arc::new(Mutex::new(allowances)),
            cache: Arc::new(Mutex::new(cache)),
        })
    }

    pub fn store_feed(&self, feed: &[Post]) -> anyhow::Result<()> {
        let bytes = bincode::serialize(feed)?;
        let db = lock(&self.cache)?;
        db.put(FEED_KEY, bytes)?;
        Ok(())
    }

    pub fn load_feed(&self) -> anyhow::Result<Option<Vec<Post>>> {
        let db = lock(&self.cache)?;
        match db.get(FEED_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl AllowanceStore for Ledger {
    fn store_allowance(&self, allowance: &PendingAllowance) -> anyhow::Result<()> {
        let bytes = bincode::serialize(allowance)?;
        let db = lock(&self.allowances)?;
        db.put(allowance_key(&allowance.owner, &allowance.spender), bytes)?;
        Ok(())
    }

    fn find_allowance(
        &self,
        owner: &Address,
        spender: &Address,
    ) -> anyhow::Result<Option<PendingAllowance>> {
        let db = lock(&self.allowances)?;
        match db.get(allowance_key(owner, spender))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn remove_allowance(&self, owner: &Address, spender: &Address) -> anyhow::Result<()> {
        let db = lock(&self.allowances)?;
        db.delete(allowance_key(owner, spender))?;
        Ok(())
    }

    fn pending_allowances(&self) -> anyhow::Result<Vec<PendingAllowance>> {
        let db = lock(&self.allowances)?;
        db.iterator(IteratorMode::Start)
            .map(|entry| -> anyhow::Result<PendingAllowance> {
                let (_, value) = entry?;
                Ok(bincode::deserialize(&value)?)
            })
            .collect()
    }
}
