mod app;
mod balance;
mod config;
mod contract;
mod dispatcher;
mod feed;
mod notify;
mod state;
mod storage;
#[cfg(test)]
mod testing;
mod types;
mod ui;
mod wallet;

use app::App;
use clap::Parser;
use config::{CliArgs, CliCommand};
use log::{debug, error};
use notify::ConsoleNotifier;
use std::io::Write;
use std::sync::Arc;
use storage::Ledger;
use tokio::io::{AsyncBufReadExt, BufReader};
use wallet::{EthersWallet, WalletProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = CliArgs::parse();
    args.validate()?;

    // A missing or unusable key means there is no wallet, which the app
    // reports like any other connection failure.
    let wallet = match &args.private_key {
        Some(key) => match EthersWallet::new(&args.rpc_url, key, args.chain_id) {
            Ok(wallet) => Some(wallet),
            Err(e) => {
                error!("(main) failed to set up wallet with error {:?}", e);
                None
            }
        },
        None => None,
    };

    let ledger = Ledger::open(&args.db_path)?;
    let app = App::start(
        wallet.as_ref().map(|w| w as &dyn WalletProvider),
        ledger,
        Arc::new(ConsoleNotifier),
        args.feed_concurrency,
    )
    .await;

    match args.command {
        Some(CliCommand::Feed { json: true }) => {
            app.refresh_feed().await;
            println!("{}", ui::render_feed_json(&app.state().snapshot())?);
        }
        Some(command) => {
            // the user has already seen the alert
            if app.execute(command.into()).await.is_err() {
                std::process::exit(1);
            }
        }
        None => run_prompt(&app).await?,
    }
    Ok(())
}

async fn run_prompt(app: &App) -> anyhow::Result<()> {
    println!("{}", ui::render_home(&app.state().snapshot().balance));
    if !app.is_connected() {
        println!("wallet not connected, only the cached feed is available");
    }
    println!("{}", ui::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => return Ok(()),
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match ui::parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        // action errors were already shown to the user
        match app.execute(command).await {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => debug!("(main) command failed with error {:?}", e),
        }
    }
}
