//! Tracing bootstrap shared by driver binaries and test harnesses.

use std::env;

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Envvar holding the OTLP collector endpoint, if spans should be exported.
pub const OTLP_URL_ENVVAR: &str = "TENON_OTLP_URL";

/// Envvar holding an extra label that is folded into the service identity.
pub const SVC_LABEL_ENVVAR: &str = "TENON_SVC_LABEL";

/// Settings consumed by [`init`].
pub struct LoggerConfig {
    whoami: String,
    otlp_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a config with the given identity and no exporter.
    pub fn new(whoami: String) -> Self {
        Self {
            whoami,
            otlp_url: None,
        }
    }

    /// Creates a config for a named service, picking up the label and the
    /// OTLP endpoint from the environment.
    pub fn for_service(base: &str) -> Self {
        let label = env::var(SVC_LABEL_ENVVAR).ok();
        Self {
            whoami: whoami_string(base, label.as_deref()),
            otlp_url: env::var(OTLP_URL_ENVVAR).ok(),
        }
    }

    pub fn set_otlp_url(&mut self, url: String) {
        self.otlp_url = Some(url);
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::for_service("(tenon-service)")
    }
}

/// Installs the global tracing subscriber.
///
/// Console output is always on, filtered through `RUST_LOG`. Span export is
/// added on top when the config carries an OTLP endpoint.
pub fn init(config: LoggerConfig) {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let console = tracing_subscriber::fmt::layer()
        .compact()
        .with_filter(filter);

    let export = config.otlp_url.as_deref().map(build_otel_layer);

    tracing_subscriber::registry()
        .with(console)
        .with(export)
        .init();

    info!(whoami = %config.whoami, "logging initialized");
}

/// Shuts down the logging subsystem, flushing whatever output is pending.
pub fn finalize() {
    info!("logging shutting down");
}

fn build_otel_layer<S>(
    url: &str,
) -> tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>
where
    S: Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let exporter = opentelemetry_otlp::new_exporter().tonic().with_endpoint(url);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .install_batch(opentelemetry_sdk::runtime::TokioCurrentThread)
        .expect("logging: install otlp pipeline");

    tracing_opentelemetry::layer().with_tracer(provider.tracer("tenon-log"))
}

fn whoami_string(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whoami_with_label() {
        assert_eq!(whoami_string("driver", Some("dev2")), "driver%dev2");
    }

    #[test]
    fn whoami_without_label() {
        assert_eq!(whoami_string("driver", None), "driver");
    }
}
