use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;

use deriverse_dashboard::config::{self, DashboardConfig, Pubkey};
use deriverse_dashboard::controller::DataSourceController;
use deriverse_dashboard::market::{MarketClient, MarketFeed};
use deriverse_dashboard::rpc::SolanaRpcClient;
use deriverse_dashboard::tui;
use deriverse_dashboard::web;

#[derive(Parser)]
#[command(name = "deriverse-dashboard", about = "Trade analytics dashboard for Deriverse perpetuals")]
struct Cli {
    /// Run mode: tui, web, or headless
    #[arg(long, default_value = "tui")]
    mode: String,

    /// Web server port (web mode only)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Solana JSON-RPC endpoint
    #[arg(long, default_value = config::DEVNET_RPC_URL)]
    rpc_url: String,

    /// Wallet to load balance and history for (omit to stay disconnected)
    #[arg(long)]
    wallet: Option<String>,

    /// Deriverse program id; malformed values fall back to the zero key
    #[arg(long, env = config::PROGRAM_ID_ENV)]
    program_id: Option<String>,

    /// Market data REST endpoint
    #[arg(long, default_value = config::MARKET_API_URL)]
    market_url: String,

    /// Terminal asset, quoted in USDT
    #[arg(long, default_value = "SOL")]
    asset: String,

    /// Chart period, e.g. "1 Day", "7 Day", "1 Year"
    #[arg(long, default_value = "1 Day")]
    period: String,

    /// Timeout for each balance/history fetch, in seconds
    #[arg(long, default_value_t = config::FETCH_TIMEOUT_SECS)]
    fetch_timeout_secs: u64,

    /// Market poll interval in seconds
    #[arg(long, default_value_t = config::POLL_INTERVAL_SECS)]
    poll_secs: u64,

    /// Start in demo mode
    #[arg(long)]
    demo: bool,

    /// Log file (tui mode logs nowhere otherwise)
    #[arg(long)]
    log_file: Option<String>,

    /// Run duration in seconds (0 = infinite)
    #[arg(long, default_value = "0")]
    duration: u64,
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    match (&cli.log_file, cli.mode.as_str()) {
        (Some(path), _) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        // Stderr output would corrupt the terminal UI.
        (None, "tui") => {}
        (None, _) => tracing_subscriber::fmt().with_env_filter(filter()).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let cfg = DashboardConfig::default()
        .with_rpc_url(cli.rpc_url.clone())
        .with_market_url(cli.market_url.clone())
        .with_program_id(config::resolve_program_id(cli.program_id.as_deref()))
        .with_fetch_timeout(Duration::from_secs(cli.fetch_timeout_secs))
        .with_poll_interval(Duration::from_secs(cli.poll_secs.max(1)));

    let wallet = cli.wallet.as_deref().and_then(|w| match w.parse::<Pubkey>() {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring wallet, staying disconnected");
            None
        }
    });

    let client = Arc::new(SolanaRpcClient::new(cfg.rpc_url.clone()));
    let controller = Arc::new(DataSourceController::new(&cfg, client, wallet));
    if cli.demo {
        controller.toggle_demo().await;
    }

    let feed = MarketFeed::start(
        MarketClient::new(cfg.market_url.clone()),
        cli.asset.clone(),
        cli.period.clone(),
        cfg.poll_interval,
    );

    match cli.mode.as_str() {
        "tui" => tui::run(controller, feed, cli.duration).await?,
        "web" => web::run(cli.port, controller, feed).await?,
        "headless" => run_headless(controller, feed, cli.duration).await,
        other => eprintln!("Unknown mode: {other}. Use --mode tui|web|headless"),
    }

    Ok(())
}

async fn run_headless(
    controller: Arc<DataSourceController<SolanaRpcClient>>,
    feed: MarketFeed,
    duration_secs: u64,
) {
    println!("=== deriverse-dashboard (headless) ===");
    println!(
        "Mode: {}, Duration: {}s",
        if controller.is_demo() { "demo" } else { "live" },
        if duration_secs == 0 { "infinite".to_string() } else { duration_secs.to_string() }
    );
    println!();

    controller.mount().await;

    let run_duration = if duration_secs == 0 {
        Duration::from_secs(3600)
    } else {
        Duration::from_secs(duration_secs)
    };
    let start = Instant::now();
    let mut market = feed.subscribe();

    while start.elapsed() < run_duration {
        match tokio::time::timeout(Duration::from_secs(1), market.changed()).await {
            Ok(Ok(())) => {
                if let Some(snap) = market.borrow_and_update().as_ref() {
                    println!(
                        "  {} {:.2} ({:+.2}%) | {} candles | book {}x{}",
                        snap.symbol,
                        snap.ticker.last_price,
                        snap.ticker.change_pct,
                        snap.chart.len(),
                        snap.book.bids.len(),
                        snap.book.asks.len()
                    );
                }
            }
            Ok(Err(_)) => break,
            Err(_) => {}
        }
    }

    let view = controller.snapshot();
    println!();
    println!("=== Results ===");
    println!("  Source:        {}", if view.is_demo { "demo" } else { "live" });
    println!("  Balance:       {:.3} SOL", view.balance);
    println!("  Total trades:  {}", view.stats.total_trades);
    println!("  Win rate:      {:.1}%", view.stats.win_rate);
    println!("  Volume:        ${:.2}", view.stats.volume);
    println!("  Net PnL:       ${:.2}", view.stats.net_pnl);
    println!("  Fees (est.):   ${:.2}", view.stats.estimated_fees);
    println!();
    for t in view.trades.iter().rev().take(10) {
        println!("  {:<24} {:<9} {:<5} {:<10} {}", t.id, t.symbol, t.side, t.status, t.timestamp);
    }

    feed.stop();
}
