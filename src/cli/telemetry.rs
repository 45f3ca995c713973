//! Log output and optional OTLP trace export.
//!
//! Export is switched on by `OTEL_EXPORTER_OTLP_ENDPOINT` (gRPC only); without
//! it spans still reach the local log formatter.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{
    global,
    propagation::TextMapCompositePropagator,
    trace::TracerProvider as _,
    KeyValue,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::{env::var, time::Duration};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};
use ulid::Ulid;

use super::commands::logging::LogFormat;

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Collector URL with a scheme; bare `host:port` gets `https://`.
fn collector_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

fn resource() -> Resource {
    let instance_id = var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| Ulid::new().to_string());
    Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
        ])
        .build()
}

fn otlp_tracer(endpoint: &str) -> Result<Tracer> {
    if let Ok(protocol) = var("OTEL_EXPORTER_OTLP_PROTOCOL") {
        if protocol != "grpc" {
            debug!("Ignoring OTEL_EXPORTER_OTLP_PROTOCOL={protocol}, exporting over gRPC");
        }
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(collector_url(endpoint))
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .context("failed to build OTLP span exporter")?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource())
        .build();

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    // A second init keeps the first provider; only one is ever flushed.
    let _ = TRACER_PROVIDER.set(provider);
    Ok(tracer)
}

/// Default level from `-v`, overridable per target through `RUST_LOG`. Noisy
/// dependencies are capped regardless.
fn env_filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    for directive in ["hyper=error", "tokio=error", "sqlx=warn", "opentelemetry_sdk=warn"] {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_target(false).with_thread_ids(false);
    match format {
        LogFormat::Pretty => layer.pretty().with_file(false).with_line_number(false).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Returns an error if the exporter cannot be built or a subscriber is
/// already installed.
pub fn init(verbosity_level: Option<Level>, format: LogFormat) -> Result<()> {
    let filter = env_filter(verbosity_level.unwrap_or(Level::ERROR))?;

    let otel_layer = match var(OTLP_ENDPOINT_ENV) {
        Ok(endpoint) => Some(tracing_opentelemetry::layer().with_tracer(otlp_tracer(&endpoint)?)),
        Err(_) => None,
    };

    let subscriber = Registry::default()
        .with(fmt_layer(format))
        .with(otel_layer)
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)
        .context("a global tracing subscriber is already installed")?;

    Ok(())
}

/// Flush pending spans. Does nothing when export was never enabled.
pub fn shutdown_tracer() {
    let Some(provider) = TRACER_PROVIDER.get() else {
        return;
    };
    debug!("Flushing trace exporter");
    if let Err(err) = provider.shutdown() {
        debug!("Trace exporter shutdown failed: {err}");
    }
}
