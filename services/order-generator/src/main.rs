use anyhow::Result;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetrySettings};
use common::ServiceConfig;
use domain::fixtures::sample_order;
use messaging::EventPublisher;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
const FAILURE_PAUSE: Duration = Duration::from_secs(2);

fn publish_interval() -> Duration {
    match std::env::var("GENERATOR_INTERVAL_MS") {
        Ok(raw) => raw.parse().map(Duration::from_millis).unwrap_or_else(|_| {
            warn!(value = %raw, "Invalid GENERATOR_INTERVAL_MS, using default");
            DEFAULT_INTERVAL
        }),
        Err(_) => DEFAULT_INTERVAL,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = ServiceConfig::from_env();

    init_telemetry(&TelemetrySettings::for_service("order-generator", &config))?;

    let interval = publish_interval();
    info!(
        "Publishing an order to {} on {} every {:?}",
        config.kafka.topic, config.kafka.brokers, interval
    );

    let publisher = EventPublisher::new(&config.kafka.brokers, config.kafka.topic.clone())?;
    let mut published: u64 = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let order_uid = Uuid::new_v4().simple().to_string();
        let order = sample_order(&order_uid);

        let pause = match publisher.publish(&order.order_uid, &order).await {
            Ok(()) => {
                published += 1;
                info!(order_uid = %order_uid, published, "Order published");
                interval
            }
            Err(e) => {
                error!(order_uid = %order_uid, "Failed to publish order: {}", e);
                FAILURE_PAUSE
            }
        };

        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    info!("Generator stopped after {} orders", published);
    shutdown_telemetry();
    Ok(())
}
