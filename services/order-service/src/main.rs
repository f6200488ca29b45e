use anyhow::Result;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetrySettings};
use common::ServiceConfig;
use futures_util::stream::StreamExt;
use ingestion::{warm_cache, OrderCache};
use order_store::{OrderRepository, PostgresOrderRepository};
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod handlers;
mod ingest;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    let config = ServiceConfig::from_env();

    init_telemetry(&TelemetrySettings::for_service("order-service", &config))?;

    info!("Starting Order Service...");
    info!("Configuration:");
    info!("  Kafka Brokers: {}", config.kafka.brokers);
    info!("  Kafka Topic: {}", config.kafka.topic);
    info!("  Consumer Group: {}", config.kafka.consumer_group);
    info!("  Dead-letter Topic: {}", config.kafka.dead_letter_topic);
    info!("  Cache TTL: {:?}", config.cache_ttl);
    info!("  Retry: {:?} after {:?}", config.retry.strategy, config.retry.delay);
    info!("  Port: {}", config.http_port);

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    let repository = PostgresOrderRepository::new(pool.clone());
    repository.ensure_schema().await?;
    let store: Arc<dyn OrderRepository> = Arc::new(repository);
    info!("Database connected successfully");

    let cache = Arc::new(OrderCache::new(config.cache_ttl));
    let sweeper = cache.spawn_sweeper();
    warm_cache(store.as_ref(), &cache).await;

    let shutdown = CancellationToken::new();
    let signals = Signals::new([SIGTERM, SIGINT])?;
    let signals_handle = signals.handle();
    tokio::spawn(wait_for_signal(signals, shutdown.clone()));

    let workers = ingest::start_workers(
        &config,
        Arc::clone(&store),
        Arc::clone(&cache),
        shutdown.clone(),
    )?;

    let app = routes::create_router(AppState::new(store, cache));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Order service listening on {}", addr);

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await;
    if let Err(e) = &served {
        error!("Server error: {}", e);
    }

    // Cleanup
    info!("Shutting down order service...");
    shutdown.cancel();
    for worker in workers {
        if let Err(e) = worker.await {
            error!("Ingestion task failed: {}", e);
        }
    }
    sweeper.shutdown().await;
    signals_handle.close();
    pool.close().await;
    info!("Order service stopped");

    shutdown_telemetry();

    served?;
    Ok(())
}

async fn wait_for_signal(mut signals: Signals, shutdown: CancellationToken) {
    while let Some(signal) = signals.next().await {
        match signal {
            SIGTERM | SIGINT => {
                info!("Received shutdown signal, stopping...");
                shutdown.cancel();
                break;
            }
            _ => {}
        }
    }
}
