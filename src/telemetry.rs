//! Telemetry logic.
//! Support tracing, metrics and logging.
use axum::extract::{MatchedPath, Request};
use axum::http::Version;
use axum::middleware::Next;
use axum::response::IntoResponse;
use metrics::{Unit, gauge};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle,
};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::trace::{Span, TraceError, Tracer};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::LogExporter;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::logs::{LogError, SdkLogger};
use opentelemetry_sdk::trace::SdkTracerProvider;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tokio::time::sleep;

use std::time::{Duration, Instant};

use crate::ServerError;

/// Interval between two process gauges refresh.
const PROCESS_REFRESH: Duration = Duration::from_secs(10);

fn resources() -> Resource {
    Resource::builder()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .build()
}

/// Create tracer for OLTP.
pub fn setup_tracer() -> Result<SdkTracerProvider, TraceError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resources())
        .build())
}

/// Create recorder for Prometheus metrics.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let mut system = System::new_with_specifics(RefreshKind::nothing());
    let pid = Pid::from_u32(std::process::id());

    tokio::spawn(async move {
        loop {
            system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing().with_memory().with_cpu(),
            );

            if let Some(process) = system.process(pid) {
                gauge!("process_memory_used_bytes").set(process.memory() as f64);
                gauge!("process_cpu_usage").set(process.cpu_usage() as f64);
            }

            sleep(PROCESS_REFRESH).await;
        }
    });

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_requests_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )?
        .install_recorder()?;

    // descriptions only reach an installed recorder.
    describe_metrics();

    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_gauge!(
        "process_cpu_usage",
        Unit::Percent,
        "CPU usage of the process in percentage."
    );
    metrics::describe_gauge!(
        "process_memory_used_bytes",
        Unit::Bytes,
        "Total process memory in bytes."
    );
    metrics::describe_counter!(
        ACCOUNT_CREATIONS,
        Unit::Count,
        "Account creation requests by outcome."
    );
    metrics::describe_counter!(
        ACCOUNT_NUMBER_COLLISIONS,
        Unit::Count,
        "Drawn account numbers already in use, by stage."
    );
}

/// Counter of account creation requests, labelled by `outcome`.
pub const ACCOUNT_CREATIONS: &str = "account_creations_total";
/// Counter of account number collisions, labelled by `stage`.
pub const ACCOUNT_NUMBER_COLLISIONS: &str = "account_number_collisions_total";

/// How an account creation request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreationOutcome {
    Created,
    /// Deposit or account type refused before storage.
    Rejected,
    /// Customer already holds an account.
    Conflict,
    /// No unused account number within the attempt cap.
    Exhausted,
    Failed,
}

impl CreationOutcome {
    pub fn of<T>(result: &Result<T, ServerError>) -> Self {
        match result {
            Ok(_) => CreationOutcome::Created,
            Err(
                ServerError::Validation(_)
                | ServerError::Json(_)
                | ServerError::InvalidDeposit(_)
                | ServerError::InvalidAccountType,
            ) => CreationOutcome::Rejected,
            Err(ServerError::CustomerAlreadyHasAccount) => {
                CreationOutcome::Conflict
            },
            Err(
                ServerError::AccountNumberTaken
                | ServerError::AccountNumberExhausted { .. },
            ) => CreationOutcome::Exhausted,
            Err(_) => CreationOutcome::Failed,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            CreationOutcome::Created => "created",
            CreationOutcome::Rejected => "rejected",
            CreationOutcome::Conflict => "conflict",
            CreationOutcome::Exhausted => "exhausted",
            CreationOutcome::Failed => "failed",
        }
    }
}

/// Where a drawn account number turned out to be taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionStage {
    /// Existence check before the insert.
    Lookup,
    /// Unique constraint hit by the insert itself.
    Insert,
}

impl CollisionStage {
    fn as_str(self) -> &'static str {
        match self {
            CollisionStage::Lookup => "lookup",
            CollisionStage::Insert => "insert",
        }
    }
}

pub fn record_account_creation(outcome: CreationOutcome) {
    metrics::counter!(ACCOUNT_CREATIONS, "outcome" => outcome.as_str())
        .increment(1);
}

pub fn record_number_collision(stage: CollisionStage) {
    metrics::counter!(ACCOUNT_NUMBER_COLLISIONS, "stage" => stage.as_str())
        .increment(1);
}

/// Create OLTP exporter for logs.
pub fn setup_logging(
    endpoint: &str,
) -> Result<OpenTelemetryTracingBridge<SdkLoggerProvider, SdkLogger>, LogError>
{
    let exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider: SdkLoggerProvider = SdkLoggerProvider::builder()
        .with_resource(resources())
        .with_batch_exporter(exporter)
        .build();
    Ok(OpenTelemetryTracingBridge::new(&provider))
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "UNKNOWN",
    }
}

/// Record a span and request metrics for every routed request.
pub async fn track(req: Request, next: Next) -> impl IntoResponse {
    let tracer = global::tracer("tracing-http");
    let mut otel_span = tracer.start("http-request");

    let start = Instant::now();
    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>()
    {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();
    let version = http_version(req.version());

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    otel_span.set_attribute(KeyValue::new("version", version));
    otel_span.set_attribute(KeyValue::new("path", path.clone()));
    otel_span.set_attribute(KeyValue::new("method", method.to_string()));
    otel_span.set_attribute(KeyValue::new("status", status.clone()));

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels)
        .record(latency);

    otel_span.end();

    response
}
