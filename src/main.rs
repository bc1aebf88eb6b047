use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use exlink::{build_cancellable_connector, ExLinkConfig};
use exlink_exchange::prelude::*;
use exlink_monitoring::prelude::*;

const DEFAULT_CONFIG_FILES: [&str; 2] = ["exlink.toml", "config/exlink.toml"];

#[derive(Parser)]
#[command(name = "exlink")]
#[command(about = "Query market data and manage orders on cryptocurrency venues")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./exlink.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Venue to talk to: gateio or yobit
    #[arg(short, long, default_value = "gateio")]
    venue: String,

    /// Log level, overriding the configuration file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tradable symbols
    Symbols,
    /// Per-symbol precision, minimum amount and fee
    MarketInfo,
    /// 24h ticker for one symbol
    Ticker { symbol: String },
    /// Tickers for several symbols (all of them where the venue allows it)
    Tickers { symbols: Vec<String> },
    /// Order book snapshot
    Orderbook { symbol: String },
    /// Candlestick series
    Klines {
        symbol: String,
        /// Candle width in seconds
        #[arg(long, default_value_t = 60)]
        group_sec: u32,
        /// How many hours back to fetch
        #[arg(long, default_value_t = 1)]
        range_hour: u32,
    },
    /// Account balances
    Balances,
    /// Open orders, optionally for one symbol
    OpenOrders { symbol: Option<String> },
    /// Place a limit order
    PlaceOrder {
        symbol: String,
        /// buy or sell
        side: String,
        price: Decimal,
        amount: Decimal,
    },
    /// Cancel one order
    CancelOrder { order_id: String, symbol: String },
    /// Cancel all orders of a kind on a symbol
    CancelAll {
        symbol: String,
        /// buy, sell or all
        #[arg(long, default_value = "all")]
        kind: String,
    },
    /// Fee for trading `amount` at `price`
    TradeFee {
        symbol: String,
        price: Decimal,
        amount: Decimal,
    },
    /// Withdrawal fee for a currency
    WithdrawalFee { currency: String },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ExLinkConfig> {
    let config = match path {
        Some(path) => ExLinkConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ExLinkConfig::from_files(&DEFAULT_CONFIG_FILES)
            .context("Failed to load configuration")?,
    };
    Ok(config)
}

fn parse_symbol(raw: &str) -> anyhow::Result<Symbol> {
    Symbol::parse(raw).ok_or_else(|| anyhow!("Invalid symbol {:?}, expected e.g. LTC_BTC", raw))
}

fn parse_side(raw: &str) -> anyhow::Result<OrderSide> {
    OrderSide::parse(raw).ok_or_else(|| anyhow!("Invalid side {:?}, expected buy or sell", raw))
}

fn parse_cancel_kind(raw: &str) -> anyhow::Result<CancelAllKind> {
    match raw.to_ascii_lowercase().as_str() {
        "buy" => Ok(CancelAllKind::Buy),
        "sell" => Ok(CancelAllKind::Sell),
        "all" => Ok(CancelAllKind::All),
        other => Err(anyhow!("Invalid cancel kind {:?}, expected buy, sell or all", other)),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancels `token` on Ctrl+C or SIGTERM so in-flight requests stop.
fn spawn_shutdown_listener(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                debug!("Ctrl+C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    debug!("SIGTERM handler unavailable: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C signal"),
            _ = terminate => info!("Received terminate signal"),
        }
        token.cancel();
    });
}

async fn run(
    connector: Arc<dyn VenueConnector>,
    logger: &StructuredLogger,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Symbols => print_json(&connector.get_symbols().await?),
        Commands::MarketInfo => print_json(&connector.get_market_info().await?),
        Commands::Ticker { symbol } => {
            let symbol = parse_symbol(&symbol)?;
            print_json(&connector.get_ticker(&symbol).await?)
        }
        Commands::Tickers { symbols } => {
            let symbols = symbols
                .iter()
                .map(|raw| parse_symbol(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&connector.get_tickers(&symbols).await?)
        }
        Commands::Orderbook { symbol } => {
            let symbol = parse_symbol(&symbol)?;
            print_json(&connector.get_orderbook(&symbol).await?)
        }
        Commands::Klines {
            symbol,
            group_sec,
            range_hour,
        } => {
            let request = KlineRequest::new(parse_symbol(&symbol)?, group_sec, range_hour);
            print_json(&connector.get_klines(&request).await?)
        }
        Commands::Balances => print_json(&connector.get_balances().await?),
        Commands::OpenOrders { symbol } => {
            let symbol = symbol.as_deref().map(parse_symbol).transpose()?;
            print_json(&connector.get_open_orders(symbol.as_ref()).await?)
        }
        Commands::PlaceOrder {
            symbol,
            side,
            price,
            amount,
        } => {
            let request = OrderRequest::new(parse_symbol(&symbol)?, parse_side(&side)?, price, amount);
            let result = connector.place_order(&request).await?;
            logger.log_order_placed(&request, &result.order_id);
            print_json(&result)
        }
        Commands::CancelOrder { order_id, symbol } => {
            let symbol = parse_symbol(&symbol)?;
            connector.cancel_order(&order_id, &symbol).await?;
            logger.log_order_cancelled(&symbol, Some(&order_id));
            print_json(&serde_json::json!({ "cancelled": order_id }))
        }
        Commands::CancelAll { symbol, kind } => {
            let symbol = parse_symbol(&symbol)?;
            let kind = parse_cancel_kind(&kind)?;
            connector.cancel_all_orders(kind, &symbol).await?;
            logger.log_order_cancelled(&symbol, None);
            print_json(&serde_json::json!({ "cancelled": kind, "symbol": symbol }))
        }
        Commands::TradeFee {
            symbol,
            price,
            amount,
        } => {
            let request = FeeRequest::Trade {
                symbol: parse_symbol(&symbol)?,
                price,
                amount,
            };
            let fee = connector.estimate_fee(&request).await?;
            logger.log_fee_estimate(&request, fee);
            print_json(&fee)
        }
        Commands::WithdrawalFee { currency } => {
            let request = FeeRequest::Withdrawal { currency };
            let fee = connector.estimate_fee(&request).await?;
            logger.log_fee_estimate(&request, fee);
            print_json(&fee)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    let _guard = setup_logging(&config.logging).context("Failed to initialize logging")?;

    let venue: VenueId = cli.venue.parse()?;
    let token = CancellationToken::new();
    spawn_shutdown_listener(token.clone());

    let connector = build_cancellable_connector(venue, &config.venue(venue), token)
        .with_context(|| format!("Failed to set up the {} connector", venue))?;
    let logger = StructuredLogger::new(venue);

    if let Err(e) = run(connector, &logger, cli.command).await {
        if let Some(err) = e.downcast_ref::<ExLinkError>() {
            logger.log_error(err);
        }
        return Err(e);
    }

    Ok(())
}
