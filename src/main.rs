//! Layernet - unified CLI

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use layernet::{BotConfig, Fleet, LoginClient, Mode, Supervisor, WsConnector, load_accounts};
use std::path::PathBuf;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,layernet=debug,layernet_protocol=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            data,
            mode,
            max_games,
        } => run_bot(config, data, mode, max_games).await,
        Command::Accounts { data } => list_accounts(data),
    }
}

/// Run the fleet until interrupted
#[instrument(skip_all, fields(config = %config_path.display()))]
async fn run_bot(
    config_path: PathBuf,
    data: Option<PathBuf>,
    mode: Option<Mode>,
    max_games: Option<u32>,
) -> Result<()> {
    let mut config = BotConfig::load_or_default(&config_path)?;
    if let Some(data) = data {
        config = config.with_data_file(data);
    }
    if let Some(mode) = mode {
        config = config.with_mode(mode);
    }
    if let Some(max_games) = max_games {
        config = config.with_max_games(max_games);
    }

    info!(
        data_file = %config.data_file().display(),
        mode = %config.mode(),
        max_games = config.max_games(),
        "Starting Layernet bot"
    );

    let supervisor = Supervisor::new(
        LoginClient::new(&config)?,
        WsConnector::from_config(&config),
        *config.max_games(),
        config.reconnect_cooldown(),
    );

    let fleet = Fleet::new(supervisor, config.data_file().clone(), *config.mode())
        .with_account_pause(config.account_pause())
        .with_cycle_pause(config.cycle_pause());

    tokio::select! {
        _ = fleet.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

/// Print the accounts that parse from the account file
fn list_accounts(data: PathBuf) -> Result<()> {
    let accounts = load_accounts(&data)?;
    for account in &accounts {
        println!(
            "{:>3}  {:<14}  {}",
            account.index(),
            account.id().to_string(),
            account.display_name()
        );
    }
    println!("{} valid account(s)", accounts.len());
    Ok(())
}
