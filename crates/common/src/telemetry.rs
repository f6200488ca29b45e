//! Process-wide log and span setup shared by the service and the generator.
//!
//! Logs are JSON lines on stdout. `RUST_LOG` overrides the configured level.
//! Spans are exported to a Jaeger agent only when one is configured.

use opentelemetry::global;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use thiserror::Error;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::ServiceConfig;

const DEFAULT_JAEGER_AGENT: &str = "localhost:6831";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Jaeger exporter could not be installed: {0}")]
    Exporter(#[from] TraceError),

    #[error("Log subscriber could not be installed: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Who is logging, how verbosely, and where spans go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub log_filter: String,
    /// `host:port` of the Jaeger agent; `None` keeps spans local
    pub jaeger_agent: Option<String>,
}

impl TelemetrySettings {
    pub fn for_service(service_name: &str, config: &ServiceConfig) -> Self {
        let jaeger_agent = config.enable_jaeger.then(|| {
            config
                .jaeger_endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_JAEGER_AGENT.to_string())
        });

        Self {
            service_name: service_name.to_string(),
            log_filter: config.log_level.clone(),
            jaeger_agent,
        }
    }
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn jaeger_tracer(service_name: &str, agent: &str) -> Result<Tracer, TraceError> {
    opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(service_name)
        .with_endpoint(agent)
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_telemetry(settings: &TelemetrySettings) -> Result<(), TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let span_export = settings
        .jaeger_agent
        .as_deref()
        .map(|agent| jaeger_tracer(&settings.service_name, agent))
        .transpose()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let json_logs = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter(&settings.log_filter))
        .with(json_logs)
        .with(span_export)
        .try_init()?;

    tracing::info!(
        service = %settings.service_name,
        jaeger_agent = settings.jaeger_agent.as_deref().unwrap_or("disabled"),
        "Logging initialized"
    );
    Ok(())
}

/// Flush spans still buffered for the Jaeger agent
pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}
