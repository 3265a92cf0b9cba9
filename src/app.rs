use super::balance::{parse_token_amount, BalanceReader};
use super::dispatcher::ActionDispatcher;
use super::feed::FeedLoader;
use super::notify::Notifier;
use super::state::AppState;
use super::storage::{AllowanceStore, Ledger};
use super::ui::{self, Command};
use super::wallet::{connect_to_wallet, WalletProvider};
use anyhow::anyhow;
use log::{info, warn};
use std::sync::Arc;

/// Components that exist once the session is fully connected.
struct Connected {
    balance: Arc<BalanceReader>,
    feed: Arc<FeedLoader>,
    dispatcher: ActionDispatcher,
}

pub struct App {
    state: AppState,
    notifier: Arc<dyn Notifier>,
    connected: Option<Connected>,
    /// Why actions are unavailable while `connected` is unset
    offline_reason: &'static str,
}

const NO_WALLET: &str = "wallet is not connected";
const NOT_BOUND: &str = "contract is not bound because the balance read failed";
const NO_TOKEN: &str = "cUSD token is unavailable";

impl App {
    /// Runs connect, balance and feed in order, each only after the previous
    /// step succeeded.
    pub async fn start(
        provider: Option<&dyn WalletProvider>,
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
        feed_concurrency: usize,
    ) -> Self {
        let state = AppState::new();
        match ledger.load_feed() {
            Ok(Some(feed)) => state.restore_feed(feed),
            Ok(None) => {}
            Err(e) => warn!("(app) failed to load cached feed with error {:?}", e),
        }

        let mut app = Self {
            state: state.clone(),
            notifier: notifier.clone(),
            connected: None,
            offline_reason: NO_WALLET,
        };

        let session = match connect_to_wallet(provider, notifier.as_ref()).await {
            Some(session) => session,
            None => return app,
        };
        state.set_identity(session.identity);

        let balance = Arc::new(BalanceReader::new(
            session.identity,
            session.chain.clone(),
            state.clone(),
        ));
        let contract = match balance.refresh().await {
            Some(contract) => contract,
            None => {
                warn!("(app) contract not bound, feed stays unavailable");
                app.offline_reason = NOT_BOUND;
                return app;
            }
        };

        let token = match session.chain.stable_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("(app) stable token unavailable with error {:?}", e);
                app.offline_reason = NO_TOKEN;
                return app;
            }
        };

        let feed = Arc::new(FeedLoader::new(
            contract.clone(),
            state.clone(),
            feed_concurrency,
            Some(ledger.clone()),
        ));
        // failures are logged by the loader
        let _ = feed.refresh().await;

        let dispatcher = ActionDispatcher::new(
            session.identity,
            contract,
            token,
            feed.clone(),
            balance.clone(),
            Arc::new(ledger.clone()),
            notifier,
        );

        // allowances of other accounts can only be revoked by connecting as them
        match ledger.pending_allowances() {
            Ok(pending) => pending
                .iter()
                .filter(|a| a.owner == session.identity)
                .for_each(|a| app.notifier.notify(&ui::render_allowance(Some(a)))),
            Err(e) => warn!("(app) failed to read allowance ledger with error {:?}", e),
        }

        info!("(app) ready as {:?}", session.identity);
        app.connected = Some(Connected {
            balance,
            feed,
            dispatcher,
        });
        app
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    fn connected(&self) -> anyhow::Result<&Connected> {
        self.connected.as_ref().ok_or_else(|| {
            self.notifier.alert(self.offline_reason);
            anyhow!(self.offline_reason)
        })
    }

    /// Reloads the feed when connected. Failures keep the feed on display.
    pub async fn refresh_feed(&self) {
        if let Some(connected) = &self.connected {
            // failures are logged by the loader
            let _ = connected.feed.refresh().await;
        }
    }

    /// Runs one command and prints what it changed. Returns `false` on quit.
    pub async fn execute(&self, command: Command) -> anyhow::Result<bool> {
        match command {
            Command::Feed => {
                self.refresh_feed().await;
                print!("{}", ui::render_feed(&self.state.snapshot()));
            }
            Command::Balance => {
                if let Some(connected) = &self.connected {
                    connected.balance.refresh().await;
                }
                println!("{}", ui::render_home(&self.state.snapshot().balance));
            }
            Command::Post {
                image,
                title,
                description,
            } => {
                self.connected()?
                    .dispatcher
                    .add_post(image, title, description)
                    .await?;
                print!("{}", ui::render_feed(&self.state.snapshot()));
            }
            Command::Comment { index, description } => {
                self.connected()?
                    .dispatcher
                    .add_comment(index, description)
                    .await?;
                self.print_post(index);
            }
            Command::Like { index } => {
                self.connected()?.dispatcher.like_post(index).await?;
                self.print_post(index);
            }
            Command::Tip { index, amount } => {
                let connected = self.connected()?;
                let amount = match parse_token_amount(&amount) {
                    Ok(amount) => amount,
                    Err(e) => {
                        self.notifier.alert(&format!("{:#}", e));
                        return Err(e);
                    }
                };
                connected.dispatcher.send_tip(index, amount).await?;
                println!("{}", ui::render_home(&self.state.snapshot().balance));
            }
            Command::Allowances => {
                let pending = self.connected()?.dispatcher.pending_allowance()?;
                println!("{}", ui::render_allowance(pending.as_ref()));
            }
            Command::Revoke => {
                self.connected()?.dispatcher.revoke_allowance().await?;
            }
            Command::Help => println!("{}", ui::HELP),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn print_post(&self, index: u64) {
        let snapshot = self.state.snapshot();
        if let Some(post) = snapshot.feed.iter().find(|p| p.index == index) {
            print!("{}", ui::render_post(post, snapshot.identity.as_ref()));
        }
    }
}
