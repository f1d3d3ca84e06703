use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bus_notifier::cache::CachedSource;
use bus_notifier::catalog::RouteCatalog;
use bus_notifier::config::{AppConfig, LogFormat, Settings, SourceMode};
use bus_notifier::domain::{Direction, Subscription, UserId};
use bus_notifier::notify::LogNotifier;
use bus_notifier::poll::Poller;
use bus_notifier::proximity::ProximityEvaluator;
use bus_notifier::simulator::SimulatedSource;
use bus_notifier::source::AnySource;
use bus_notifier::store::{AnyStore, Subscriptions};
use bus_notifier::tdx::{TdxAuth, TdxClient};
use bus_notifier::web::{AppState, create_router};

#[derive(Parser)]
#[command(
    name = "bus-notifier",
    version,
    about = "Tell subscribers when their bus is about to reach their stop"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll and notify until interrupted (the default)
    Run {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,

        /// Do not serve the HTTP API
        #[arg(long)]
        no_http: bool,
    },

    /// Add a subscription
    Subscribe {
        user: String,
        route: String,
        /// Stop to be notified about, by its Chinese name
        stop: String,
        /// 0 outbound, 1 inbound
        #[arg(long, value_parser = parse_direction)]
        direction: Direction,
        /// Sub-route name, if different from the route name
        #[arg(long)]
        sub_route: Option<String>,
    },

    /// List a user's subscriptions
    List { user: String },

    /// Remove a subscription by its position in `list`
    Unsubscribe { user: String, index: usize },

    /// List routes known to the source
    Routes,
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "0" | "outbound" | "out" => Ok(Direction::Outbound),
        "1" | "inbound" | "in" => Ok(Direction::Inbound),
        other => Err(format!("unknown direction {other:?}; expected 0 or 1")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.settings.log_format);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<(), Box<dyn Error>> {
    let command = cli.command.unwrap_or(Command::Run {
        once: false,
        no_http: false,
    });
    let store = cli.settings.store();
    info!(dir = %store.dir().display(), "Using subscription store");
    let store = AnyStore::File(store);

    // Listing and removing work from the store alone, without source settings
    match command {
        Command::List { user } => {
            let subs = Subscriptions::new(store, RouteCatalog::default());
            let user = UserId::parse(&user)?;
            let list = subs.list(&user).await?;
            if list.is_empty() {
                println!("{user} has no subscriptions");
            }
            for (i, sub) in list.iter().enumerate() {
                println!(
                    "{i}: {} ({}) direction {} at {}",
                    sub.route, sub.sub_route, sub.direction, sub.target_stop
                );
            }
            return Ok(());
        }
        Command::Unsubscribe { user, index } => {
            let subs = Subscriptions::new(store, RouteCatalog::default());
            let removed = subs.unsubscribe(&UserId::parse(&user)?, index).await?;
            println!("Removed {} at {}", removed.route_key(), removed.target_stop);
            return Ok(());
        }
        _ => {}
    }

    let config = cli.settings.into_config()?;
    let source = build_source(&config)?;
    let catalog = RouteCatalog::fetch(&source).await?;
    info!(routes = catalog.len().await, "Loaded route catalog");
    let subscriptions = Arc::new(Subscriptions::new(store, catalog));

    match command {
        Command::Run { once, no_http } => {
            run(config, source, subscriptions, once, no_http).await?;
        }
        Command::Subscribe {
            user,
            route,
            stop,
            direction,
            sub_route,
        } => {
            let user = UserId::parse(&user)?;
            let sub_route = sub_route.unwrap_or_else(|| route.clone());
            let sub = Subscription::new(route, sub_route, direction, stop);
            let key = sub.route_key();
            subscriptions.subscribe(&user, sub).await?;
            println!("Subscribed {user} to {key}");
        }
        Command::Routes => {
            for route in subscriptions.catalog().list().await {
                let directions: Vec<String> = route
                    .sub_routes
                    .values()
                    .map(|s| format!("{} dir {}", s.name, s.direction))
                    .collect();
                println!(
                    "{}: {} - {} [{}]",
                    route.name,
                    route.departure_stop,
                    route.destination_stop,
                    directions.join(", ")
                );
            }
        }
        Command::List { .. } | Command::Unsubscribe { .. } => {}
    }

    Ok(())
}

fn build_source(config: &AppConfig) -> Result<AnySource, Box<dyn Error>> {
    match &config.source {
        SourceMode::Simulator(path) => {
            let sim = SimulatedSource::load(path)?;
            info!(
                path = %path.display(),
                routes = sim.keys().count(),
                "Using simulated live data"
            );
            Ok(AnySource::Simulated(sim))
        }
        SourceMode::Tdx(tdx) => {
            let auth = TdxAuth::new(&tdx.client_id, &tdx.client_secret, tdx.timeout())?;
            info!(city = %tdx.city, "Using TDX live data");
            Ok(AnySource::Tdx(TdxClient::new(tdx, auth)?))
        }
    }
}

async fn run(
    config: AppConfig,
    source: AnySource,
    subscriptions: Arc<Subscriptions<AnyStore>>,
    once: bool,
    no_http: bool,
) -> Result<(), Box<dyn Error>> {
    let poller = Poller::new(
        CachedSource::new(source, &config.cache),
        subscriptions.clone(),
        ProximityEvaluator::new(config.proximity.clone()),
        LogNotifier,
    );

    if once {
        let report = poller.run_cycle().await?;
        info!(?report, "Single cycle complete");
        return Ok(());
    }

    if !no_http {
        let app = create_router(AppState::new(subscriptions));
        let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
        info!(addr = %config.http_addr, "HTTP API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "HTTP server failed");
            }
        });
    }

    info!(
        interval = ?config.poll.interval,
        policy = %config.proximity.policy,
        "Starting poll loop"
    );
    poller.run(&config.poll, shutdown_signal()).await;
    info!("Stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
