use std::sync::Arc;
use std::time::Duration;

use algo_trade_arbitrage_cross::{
    BookCache, Controller, CrossExchangeDetector, CrossExecutor, DetectorConfig, EventLog,
    FeeCalculator, FeeConfig as CrossFeeConfig, RiskGate,
};
use algo_trade_core::venue_client::{Venue, VenueClient};
use algo_trade_core::ConfigLoader;
use algo_trade_kalshi::{KalshiClient, KalshiClientConfig, KalshiExecutor, KalshiExecutorConfig, KalshiVenueClient};
use algo_trade_polymarket::arbitrage::{PaperExecutor, PaperExecutorConfig, PolymarketExecutor};
use algo_trade_polymarket::venue_client::PolymarketVenueClient;
use algo_trade_polymarket::{GammaClient, PolymarketClient};
use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(name = "algo-trade")]
#[command(about = "Cross-venue prediction-market arbitrage bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the arbitrage controller against both venues until interrupted.
    Run {
        /// Override config profile (loads config/Config.<profile>.toml on top of Config.toml)
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Run a single discovery pass against both venues and print the matched pairs.
    Discover {
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { profile } => run(profile).await,
        Commands::Discover { profile } => discover(profile).await,
    }
}

fn load_config(profile: Option<String>) -> anyhow::Result<algo_trade_core::AppConfig> {
    match profile {
        Some(p) => ConfigLoader::load_with_profile(&p),
        None => ConfigLoader::load(),
    }
}

/// Builds the venue clients, risk gate, and event log shared by both `run`
/// and `discover`. Kalshi always talks to the demo environment unless
/// `simulation_mode` is false, at which point it talks to production;
/// Polymarket's executor is `PaperExecutor` in both modes today — there is
/// no live EIP-712-signing executor in this workspace yet, so live mode
/// only disables Kalshi's demo guard rails, not Polymarket's.
async fn build(
    config: &algo_trade_core::AppConfig,
) -> anyhow::Result<(Arc<dyn VenueClient>, Arc<dyn VenueClient>, Arc<RiskGate>, Arc<EventLog>)> {
    let (kalshi_client, kalshi_executor) = if config.simulation_mode {
        (KalshiClient::demo()?, KalshiExecutor::demo()?)
    } else {
        let executor_config = KalshiExecutorConfig {
            client_config: KalshiClientConfig::production(),
            ..KalshiExecutorConfig::demo()
        };
        (KalshiClient::production()?, KalshiExecutor::new(executor_config)?)
    };
    let venue_k: Arc<dyn VenueClient> = Arc::new(KalshiVenueClient::new(
        Arc::new(kalshi_client),
        Arc::new(kalshi_executor),
    ));

    let poly_executor: Arc<dyn PolymarketExecutor> = Arc::new(PaperExecutor::new(
        PaperExecutorConfig {
            initial_balance: Decimal::from(1000),
            ..PaperExecutorConfig::default()
        },
    ));
    let venue_p: Arc<dyn VenueClient> =
        Arc::new(PolymarketVenueClient::new(PolymarketClient::new(), GammaClient::new(), poly_executor));

    let initial_bankroll = venue_k
        .balance()
        .await
        .context("fetching initial Kalshi balance")?
        .unwrap_or(Decimal::from(1000));
    let risk_gate = Arc::new(RiskGate::new(initial_bankroll, config.risk.clone()));

    let (event_log, writer_handle) = EventLog::connect(&config.database.url)
        .await
        .context("connecting event log database")?;
    // The writer task outlives this function; it drains until every
    // `EventLog` clone (held by the Controller) is dropped at shutdown.
    std::mem::forget(writer_handle);

    Ok((venue_k, venue_p, risk_gate, Arc::new(event_log)))
}

fn decimal_from_f64(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or_default()
}

fn fee_config_from_app(config: &algo_trade_core::config::FeeConfig) -> CrossFeeConfig {
    CrossFeeConfig::new(
        decimal_from_f64(config.kalshi_taker_rate),
        decimal_from_f64(config.poly_flat_fee),
    )
}

async fn run(profile: Option<String>) -> anyhow::Result<()> {
    let config = load_config(profile)?;
    tracing::info!(simulation_mode = config.simulation_mode, "starting controller");

    let (venue_k, venue_p, risk_gate, event_log) = build(&config).await?;
    let book_cache = Arc::new(BookCache::with_freshness_window(Duration::from_millis(
        config.controller.book_freshness_ms,
    )));

    let fees = FeeCalculator::with_config(fee_config_from_app(&config.fees));
    let detector = Arc::new(CrossExchangeDetector::with_config_and_fees(
        DetectorConfig {
            min_profit: decimal_from_f64(config.risk.min_profit),
        },
        fees,
    ));

    let executor = Arc::new(CrossExecutor::new(
        venue_k.clone(),
        venue_p.clone(),
        book_cache.clone(),
        risk_gate.clone(),
    ));

    let controller = Arc::new(Controller::with_global_cooldown(
        venue_k.clone(),
        venue_p.clone(),
        book_cache.clone(),
        risk_gate.clone(),
        detector,
        executor,
        event_log,
        Duration::from_secs(config.controller.cooldown_seconds),
    ));

    let balance_sync_interval = Duration::from_secs(config.controller.balance_sync_seconds);
    {
        let venue_k = venue_k.clone();
        risk_gate.start_background_sync(balance_sync_interval, move || {
            let venue_k = venue_k.clone();
            async move { venue_k.balance().await.ok().flatten() }
        });
    }

    let pairs_discovered = controller
        .discover()
        .await
        .context("initial discovery pass")?;
    tracing::info!(pairs_discovered, "initial discovery complete");

    let (mut k_updates, mut p_updates) = controller
        .subscribe_all()
        .await
        .context("subscribing to both venues")?;

    {
        let controller = controller.clone();
        tokio::spawn(async move {
            while let Some(update) = k_updates.recv().await {
                controller.on_book_update(Venue::K, update);
            }
            tracing::warn!("venue K book stream closed");
        });
    }
    {
        let controller = controller.clone();
        tokio::spawn(async move {
            while let Some(update) = p_updates.recv().await {
                controller.on_book_update(Venue::P, update);
            }
            tracing::warn!("venue P book stream closed");
        });
    }

    let shutdown_controller = controller.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received shutdown signal");
        shutdown_controller.shutdown();
    });

    let tick_interval = Duration::from_millis(config.controller.detect_cache_ms.max(50));
    controller
        .run(tick_interval, Duration::from_secs(5 * 60))
        .await;

    tracing::info!("controller stopped");
    Ok(())
}

async fn discover(profile: Option<String>) -> anyhow::Result<()> {
    let config = load_config(profile)?;
    let (venue_k, venue_p, risk_gate, event_log) = build(&config).await?;
    let book_cache = Arc::new(BookCache::with_freshness_window(Duration::from_millis(
        config.controller.book_freshness_ms,
    )));
    let fees = FeeCalculator::with_config(fee_config_from_app(&config.fees));
    let detector = Arc::new(CrossExchangeDetector::with_config_and_fees(
        DetectorConfig::default(),
        fees,
    ));
    let executor = Arc::new(CrossExecutor::new(
        venue_k.clone(),
        venue_p.clone(),
        book_cache.clone(),
        risk_gate.clone(),
    ));

    let controller = Controller::with_global_cooldown(
        venue_k,
        venue_p,
        book_cache,
        risk_gate,
        detector,
        executor,
        event_log,
        Duration::from_secs(config.controller.cooldown_seconds),
    );

    let count = controller.discover().await.context("discovery pass")?;
    println!("matched {count} new pairs; {} total tracked", controller.active_pair_count());
    Ok(())
}
