//! # ordercast-daemon
//!
//! Ordercast server binary — wires the order store, event bus, broker and
//! HTTP/WebSocket server together and runs them until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use ordercast_bus::broker::topology::NOTIFY_QUEUES;
use ordercast_bus::{Broker, BrokerConfig, EventBus, RedeliveryPolicy};
use ordercast_core::MemoryOrderStore;
use ordercast_server::OrderService;
use ordercast_server::config::ServerConfig;
use ordercast_server::dispatch::spawn_dispatchers;
use ordercast_server::server::OrdercastServer;
use ordercast_server::websocket::run_sweeper;
use ordercast_settings::{OrdercastSettings, loader};

/// Ordercast notification server.
#[derive(Parser, Debug)]
#[command(name = "ordercast-daemon", about = "Ordercast real-time order notification server")]
struct Cli {
    /// Host to bind (overrides settings if specified).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings if specified).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level filter (overrides settings if specified).
    #[arg(long)]
    log_level: Option<String>,
}

/// Translate broker settings into the broker's own config type.
fn broker_config(settings: &OrdercastSettings) -> BrokerConfig {
    BrokerConfig {
        stat_ttl: Duration::from_millis(settings.broker.stat_ttl_ms),
        expiry_tick: Duration::from_millis(settings.broker.expiry_tick_ms),
        redelivery: match settings.broker.redelivery {
            ordercast_settings::RedeliveryPolicy::Drop => RedeliveryPolicy::Drop,
            ordercast_settings::RedeliveryPolicy::Requeue => RedeliveryPolicy::Requeue,
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Load settings early (needed for log level before logging init).
    let settings_path = args.config.clone().unwrap_or_else(loader::settings_path);
    let settings = loader::load_settings_from_path(&settings_path).unwrap_or_default();

    let level = args.log_level.as_deref().unwrap_or(&settings.logging.level);
    ordercast_core::logging::init_subscriber(level);
    let metrics_handle = ordercast_server::metrics::install_recorder();

    let mut config = ServerConfig::from_settings(&settings);
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // Domain plumbing: store, in-process bus, durable broker.
    let store = Arc::new(MemoryOrderStore::new());
    let bus = EventBus::new();
    let broker = Arc::new(Broker::new(broker_config(&settings)));
    let orders = Arc::new(OrderService::new(store, bus.clone(), Arc::clone(&broker)));

    let server = OrdercastServer::new(config, orders, metrics_handle);
    let token = server.shutdown().token();

    // Background tasks, named so shutdown can attribute stragglers.
    let mut tasks = vec![(
        "sweeper",
        tokio::spawn(run_sweeper(
            server.users(),
            server.stores(),
            server.config().sweep_interval,
            token.clone(),
        )),
    )];
    tasks.extend(spawn_dispatchers(
        &bus,
        server.users(),
        server.stores(),
        Arc::clone(&broker),
        &token,
    ));
    for queue in NOTIFY_QUEUES {
        tasks.push((
            queue,
            tokio::spawn(ordercast_bus::run_notify_consumer(
                Arc::clone(&broker),
                queue,
                token.clone(),
            )),
        ));
    }
    tasks.push((
        "stat_consumer",
        tokio::spawn(ordercast_bus::run_stat_consumer(
            Arc::clone(&broker),
            token.clone(),
        )),
    ));
    tasks.push((
        "dead_letter_inspector",
        tokio::spawn(ordercast_bus::run_dead_letter_inspector(
            Arc::clone(&broker),
            token.clone(),
        )),
    ));
    tasks.push((
        "broker_expiry",
        tokio::spawn(Arc::clone(&broker).run_expiry(token.clone())),
    ));

    let handle = server.listen().await.context("Failed to bind server")?;
    tracing::info!("ordercast listening on http://{}", handle.addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().graceful_shutdown(tasks, None).await;
    // Open client channels can outlive the drain window; don't wait on them
    // forever.
    let _ = tokio::time::timeout(Duration::from_secs(5), handle.stopped()).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
