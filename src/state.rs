use super::types::{Balance, Post, SigningIdentity};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::watch;

/// Everything the presentation layer renders. Never patched in place,
/// every update publishes a new snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub identity: Option<SigningIdentity>,
    pub balance: Balance,
    pub feed: Vec<Post>,
    /// Generation of the refresh that produced `feed`, 0 until the
    /// first refresh publishes
    pub feed_generation: u64,
}

#[derive(Clone)]
pub struct AppState {
    sender: Arc<watch::Sender<Arc<Snapshot>>>,
    next_generation: Arc<AtomicU64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            sender: Arc::new(sender),
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.sender.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.sender.subscribe()
    }

    pub fn set_identity(&self, identity: SigningIdentity) {
        self.replace(|next| next.identity = Some(identity));
    }

    pub fn set_balance(&self, balance: Balance) {
        self.replace(|next| next.balance = balance);
    }

    /// Shows a feed from a previous run. Any refresh of this run wins over it.
    pub fn restore_feed(&self, feed: Vec<Post>) {
        self.sender.send_if_modified(|current| {
            if current.feed_generation != 0 {
                return false;
            }
            let mut next = Snapshot::clone(current);
            next.feed = feed;
            *current = Arc::new(next);
            true
        });
    }

    /// Reserves the generation number of a refresh that is about to start.
    pub fn begin_feed_refresh(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publishes `feed` unless a refresh that started later already did.
    /// Returns whether the feed was published.
    pub fn publish_feed(&self, generation: u64, feed: Vec<Post>) -> bool {
        self.sender.send_if_modified(|current| {
            if generation <= current.feed_generation {
                return false;
            }
            let mut next = Snapshot::clone(current);
            next.feed = feed;
            next.feed_generation = generation;
            *current = Arc::new(next);
            true
        })
    }

    fn replace(&self, update: impl FnOnce(&mut Snapshot)) {
        self.sender.send_modify(|current| {
            let mut next = Snapshot::clone(current);
            update(&mut next);
            *current = Arc::new(next);
        });
    }
}
