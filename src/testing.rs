//! In-memory stand-ins for the wallet, chain and contracts.

use super::contract::{PostsContract, StableToken};
use super::notify::Notifier;
use super::storage::{AllowanceStore, PendingAllowance};
use super::types::{Comment, PostRecord, SigningIdentity, APP_CONTRACT};
use super::wallet::{ChainHandle, WalletProvider};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use ethers_core::types::{Address, U256};
use std::collections::{BTreeMap, HashSet};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

pub fn record(author: Address, title: &str, likes: u64) -> PostRecord {
    PostRecord {
        author,
        image: format!("https://img/{}", title),
        title: title.to_string(),
        description: String::new(),
        likes: U256::from(likes),
        comments: vec![],
    }
}

type DelayFn = Box<dyn Fn(u64) -> Duration + Send + Sync>;

#[derive(Default)]
pub struct FakeContract {
    posts: Mutex<Vec<PostRecord>>,
    signer: Mutex<Address>,
    read_delay: Mutex<Option<Arc<DelayFn>>>,
    failing_reads: Mutex<HashSet<u64>>,
    fail_length: AtomicBool,
    fail_writes: AtomicBool,
    fail_tips: AtomicBool,
    length_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    tips: Mutex<Vec<(U256, U256)>>,
}

impl FakeContract {
    pub fn with_posts(posts: Vec<PostRecord>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    pub fn push_post(&self, post: PostRecord) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn set_signer(&self, signer: Address) {
        *self.signer.lock().unwrap() = signer;
    }

    pub fn set_read_delay(&self, delay: impl Fn(u64) -> Duration + Send + Sync + 'static) {
        *self.read_delay.lock().unwrap() = Some(Arc::new(Box::new(delay)));
    }

    pub fn fail_read_at(&self, index: u64) {
        self.failing_reads.lock().unwrap().insert(index);
    }

    pub fn fail_length(&self, fail: bool) {
        self.fail_length.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_tips(&self, fail: bool) {
        self.fail_tips.store(fail, Ordering::SeqCst);
    }

    pub fn length_calls(&self) -> usize {
        self.length_calls.load(Ordering::SeqCst)
    }

    pub fn max_reads_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn tips(&self) -> Vec<(U256, U256)> {
        self.tips.lock().unwrap().clone()
    }

    fn check_write(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("execution reverted");
        }
        Ok(())
    }

    fn with_post(
        &self,
        index: U256,
        update: impl FnOnce(&mut PostRecord),
    ) -> anyhow::Result<()> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .get_mut(index.as_usize())
            .ok_or_else(|| anyhow!("execution reverted: no post {}", index))?;
        update(post);
        Ok(())
    }
}

#[async_trait]
impl PostsContract for FakeContract {
    fn address(&self) -> Address {
        APP_CONTRACT
    }

    async fn posts_length(&self) -> anyhow::Result<U256> {
        self.length_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_length.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(U256::from(self.posts.lock().unwrap().len()))
    }

    async fn get_post(&self, index: U256) -> anyhow::Result<PostRecord> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = self.read_delay.lock().unwrap().clone();
        if let Some(delay) = delay {
            tokio::time::sleep(delay(index.as_u64())).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_reads.lock().unwrap().contains(&index.as_u64()) {
            bail!("read of post {} timed out", index);
        }
        self.posts
            .lock()
            .unwrap()
            .get(index.as_usize())
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted: no post {}", index))
    }

    async fn new_post(
        &self,
        image: String,
        title: String,
        description: String,
    ) -> anyhow::Result<()> {
        self.check_write()?;
        let author = *self.signer.lock().unwrap();
        self.push_post(PostRecord {
            author,
            image,
            title,
            description,
            likes: U256::zero(),
            comments: vec![],
        });
        Ok(())
    }

    async fn add_comment(&self, index: U256, description: String) -> anyhow::Result<()> {
        self.check_write()?;
        self.with_post(index, |post| post.comments.push(Comment { description }))
    }

    async fn like_post(&self, index: U256) -> anyhow::Result<()> {
        self.check_write()?;
        self.with_post(index, |post| post.likes += U256::one())
    }

    async fn send_tip(&self, index: U256, amount: U256) -> anyhow::Result<()> {
        self.check_write()?;
        if self.fail_tips.load(Ordering::SeqCst) {
            bail!("execution reverted: transfer failed");
        }
        self.tips.lock().unwrap().push((index, amount));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeToken {
    fail_approvals: AtomicBool,
    approvals: Mutex<Vec<(Address, U256)>>,
}

impl FakeToken {
    pub fn fail_approvals(&self, fail: bool) {
        self.fail_approvals.store(fail, Ordering::SeqCst);
    }

    pub fn approvals(&self) -> Vec<(Address, U256)> {
        self.approvals.lock().unwrap().clone()
    }
}

#[async_trait]
impl StableToken for FakeToken {
    async fn balance_of(&self, _owner: Address) -> anyhow::Result<U256> {
        Ok(U256::zero())
    }

    async fn approve(&self, spender: Address, amount: U256) -> anyhow::Result<()> {
        if self.fail_approvals.load(Ordering::SeqCst) {
            bail!("user rejected transaction");
        }
        self.approvals.lock().unwrap().push((spender, amount));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeChain {
    pub contract: Arc<FakeContract>,
    pub token: Arc<FakeToken>,
    balance: Mutex<U256>,
    fail_balance: AtomicBool,
    balance_calls: AtomicUsize,
    bind_calls: AtomicUsize,
}

impl FakeChain {
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance: Mutex::new(balance),
            ..Default::default()
        }
    }

    pub fn fail_balance(&self, fail: bool) {
        self.fail_balance.store(fail, Ordering::SeqCst);
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn bind_calls(&self) -> usize {
        self.bind_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainHandle for FakeChain {
    async fn total_balance(&self, _owner: Address) -> anyhow::Result<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_balance.load(Ordering::SeqCst) {
            bail!("rpc unavailable");
        }
        Ok(*self.balance.lock().unwrap())
    }

    fn bind_contract(&self) -> anyhow::Result<Arc<dyn PostsContract>> {
        self.bind_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.contract.clone())
    }

    fn stable_token(&self) -> anyhow::Result<Arc<dyn StableToken>> {
        Ok(self.token.clone())
    }
}

pub struct FakeWallet {
    accounts: Option<Vec<Address>>,
    chain: Arc<FakeChain>,
    enable_calls: AtomicUsize,
}

impl FakeWallet {
    pub fn with_accounts(accounts: Vec<Address>, chain: Arc<FakeChain>) -> Self {
        Self {
            accounts: Some(accounts),
            chain,
            enable_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accounts: None,
            chain: Arc::new(FakeChain::default()),
            enable_calls: AtomicUsize::new(0),
        }
    }

    pub fn fake_chain(&self) -> &Arc<FakeChain> {
        &self.chain
    }

    pub fn enable_calls(&self) -> usize {
        self.enable_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn enable(&self) -> anyhow::Result<Vec<Address>> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.accounts
            .clone()
            .ok_or_else(|| anyhow!("user rejected the request"))
    }

    fn chain(&self, _identity: SigningIdentity) -> anyhow::Result<Arc<dyn ChainHandle>> {
        Ok(self.chain.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
    notifications: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn notify(&self, message: &str) {
        self.notifications.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct FakeAllowances {
    records: Mutex<BTreeMap<(Address, Address), PendingAllowance>>,
    fail_removals: AtomicBool,
}

impl FakeAllowances {
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl AllowanceStore for FakeAllowances {
    fn store_allowance(&self, allowance: &PendingAllowance) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert((allowance.owner, allowance.spender), allowance.clone());
        Ok(())
    }

    fn find_allowance(
        &self,
        owner: &Address,
        spender: &Address,
    ) -> anyhow::Result<Option<PendingAllowance>> {
        Ok(self.records.lock().unwrap().get(&(*owner, *spender)).cloned())
    }

    fn remove_allowance(&self, owner: &Address, spender: &Address) -> anyhow::Result<()> {
        if self.fail_removals.load(Ordering::SeqCst) {
            bail!("IO error: no space left on device");
        }
        self.records.lock().unwrap().remove(&(*owner, *spender));
        Ok(())
    }

    fn pending_allowances(&self) -> anyhow::Result<Vec<PendingAllowance>> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}
