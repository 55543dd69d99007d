#![forbid(unsafe_code)]
#![warn(unused, rust_2018_idioms)]

//! Arara command-line entrypoint.
//!
//! `arara run` drives the orchestrator loop until ctrl-c; the remaining
//! commands are the manual-override surface (basket creation, the status
//! gate, and the emergency closer).

use arara_core::emergency::DEFAULT_SAFETY_MARGIN;
use arara_core::logging::init_logging;
use arara_core::{EmergencyCloser, Orchestrator, Settings, SystemStatusGate};
use arara_exchange::{BinanceClient, FilterCache};
use arara_markets::BasketId;
use arara_store::{Basket, BasketStatus, Store};
use arara_strategy::GridConfig;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "arara", about = "Automated spot-market grid trader")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the trading loop until interrupted.
    Run,
    /// Create a basket from a grid config file.
    CreateBasket {
        /// Path to a JSON grid configuration.
        #[arg(long)]
        config: PathBuf,
        /// Override the configured anchor price.
        #[arg(long)]
        anchor: Option<Decimal>,
    },
    /// Cancel a basket's open orders and exit its position at a safety margin.
    Close {
        /// Basket id to close.
        #[arg(long)]
        basket: String,
        /// Fractional distance below the market for the exit limit.
        #[arg(long, default_value_t = DEFAULT_SAFETY_MARGIN)]
        safety_margin: Decimal,
    },
    /// Mark a basket closed so the loop stops trading it.
    Archive {
        /// Basket id to close.
        #[arg(long)]
        basket: String,
    },
    /// Allow the executor to trade.
    Start,
    /// Suppress the executor (the loop keeps observing).
    Stop,
    /// Print gate state, active baskets, and the latest balance snapshot.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Run => {
            let settings = Settings::from_env()?;
            let store = Store::connect(&settings.database_url).await?;
            let client = BinanceClient::new(settings.exchange_config())?;
            let orchestrator = Orchestrator::new(client, store, settings.cycle_interval());

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown signal received; finishing current cycle");
                    let _ = shutdown_tx.send(true);
                }
            });
            orchestrator.run(shutdown_rx).await;
        }
        Command::CreateBasket { config, anchor } => {
            let settings = Settings::from_env()?;
            let store = Store::connect(&settings.database_url).await?;

            let raw = std::fs::read_to_string(&config)?;
            let mut grid: GridConfig = serde_json::from_str(&raw)?;
            if let Some(anchor) = anchor {
                grid.anchor_price = anchor;
            }
            grid.validate()?;

            let id = BasketId::generate(Utc::now());
            store
                .insert_basket(&Basket {
                    id: id.clone(),
                    pair: grid.pair.clone(),
                    anchor_price: grid.anchor_price,
                    status: BasketStatus::Active,
                    config_json: serde_json::to_string(&grid)?,
                    created_at: Utc::now(),
                    closed_at: None,
                })
                .await?;
            println!("created basket {id}: {} anchored at {}", grid.pair, grid.anchor_price);
        }
        Command::Close {
            basket,
            safety_margin,
        } => {
            let settings = Settings::from_env()?;
            let store = Store::connect(&settings.database_url).await?;
            let client = BinanceClient::new(settings.exchange_config())?;
            let filters = FilterCache::default();

            let basket = BasketId::new(&basket)?;
            let outcome = EmergencyCloser::new(&client, &store, &filters)
                .close(&basket, safety_margin)
                .await;
            println!(
                "success: {}\nmessage: {}\ncanceled: {}\nexit placed: {}",
                outcome.success, outcome.message, outcome.canceled_count, outcome.exit_order_placed
            );
            if !outcome.success {
                return Err(outcome.message.into());
            }
        }
        Command::Archive { basket } => {
            let settings = Settings::from_env()?;
            let store = Store::connect(&settings.database_url).await?;
            let basket = BasketId::new(&basket)?;
            if store.basket(&basket).await?.is_none() {
                return Err(format!("unknown basket {basket}").into());
            }
            store
                .update_basket_status(&basket, BasketStatus::Closed, Some(Utc::now()))
                .await?;
            println!("basket {basket} closed");
        }
        Command::Start => {
            let settings = Settings::from_env()?;
            let store = Store::connect(&settings.database_url).await?;
            SystemStatusGate::new(store).start().await?;
            println!("system status: running");
        }
        Command::Stop => {
            let settings = Settings::from_env()?;
            let store = Store::connect(&settings.database_url).await?;
            SystemStatusGate::new(store).stop().await?;
            println!("system status: stopped");
        }
        Command::Status => {
            let settings = Settings::from_env()?;
            let store = Store::connect(&settings.database_url).await?;
            let gate = SystemStatusGate::new(store.clone());

            println!("system status: {}", gate.status().await?);
            let baskets = store.active_baskets().await?;
            if baskets.is_empty() {
                println!("no active baskets");
            }
            for basket in baskets {
                println!(
                    "basket {}: {} anchored at {} (created {})",
                    basket.id, basket.pair, basket.anchor_price, basket.created_at
                );
            }
            if let Some(snapshot) = store.latest_snapshot().await? {
                println!(
                    "last snapshot {}: quote {} / base {} (total {})",
                    snapshot.created_at,
                    snapshot.quote_free,
                    snapshot.base_free,
                    snapshot.total_value_quote
                );
            }
        }
    }
    Ok(())
}
