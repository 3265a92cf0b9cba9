use super::feed::DEFAULT_FEED_CONCURRENCY;
use super::types::ALFAJORES_CHAIN_ID;
use super::ui::Command as UiCommand;
use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_RPC_URL: &str = "https://alfajores-forno.celo-testnet.org";

/// Celogram - post, like, comment and tip on Celo from the terminal
///
/// Without a subcommand an interactive prompt is started.
#[derive(Parser, Debug)]
#[command(name = "celogram")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct CliArgs {
    /// JSON-RPC endpoint of the chain
    #[arg(long, env = "CELOGRAM_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Hex private key of the signing account. Without it no wallet is available
    #[arg(long, env = "CELOGRAM_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Chain id the endpoint must report
    #[arg(long, env = "CELOGRAM_CHAIN_ID", default_value_t = ALFAJORES_CHAIN_ID)]
    pub chain_id: u64,

    /// Maximum number of post reads in flight during a feed refresh (1-256)
    #[arg(long, env = "CELOGRAM_FEED_CONCURRENCY", default_value_t = DEFAULT_FEED_CONCURRENCY)]
    pub feed_concurrency: usize,

    /// Directory of the local allowance ledger and feed cache
    #[arg(long, env = "CELOGRAM_DB_PATH", default_value = "./dbs")]
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Show all posts
    Feed {
        /// Print the feed as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the cUSD balance
    Balance,
    /// Publish a post
    Post {
        image: String,
        title: String,
        description: String,
    },
    /// Comment on a post
    Comment { index: u64, text: String },
    /// Like a post
    Like { index: u64 },
    /// Tip the author of a post, amount in cUSD
    Tip { index: u64, amount: String },
    /// Show the allowance left behind by a failed tip
    Allowances,
    /// Cancel the allowance left behind by a failed tip
    Revoke,
}

impl From<CliCommand> for UiCommand {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Feed { .. } => UiCommand::Feed,
            CliCommand::Balance => UiCommand::Balance,
            CliCommand::Post {
                image,
                title,
                description,
            } => UiCommand::Post {
                image,
                title,
                description,
            },
            CliCommand::Comment { index, text } => UiCommand::Comment {
                index,
                description: text,
            },
            CliCommand::Like { index } => UiCommand::Like { index },
            CliCommand::Tip { index, amount } => UiCommand::Tip { index, amount },
            CliCommand::Allowances => UiCommand::Allowances,
            CliCommand::Revoke => UiCommand::Revoke,
        }
    }
}

impl CliArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=256).contains(&self.feed_concurrency) {
            bail!(
                "feed concurrency must be between 1 and 256, got {}",
                self.feed_concurrency
            );
        }
        if self.rpc_url.trim().is_empty() {
            bail!("rpc url must not be empty");
        }
        Ok(())
    }
}
