//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and the admission metrics, and an async HTTP exporter that
//! serves `/metrics` using `hyper`.

use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, header::HeaderValue,
    server::conn::http1, service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

use super::{AdmissionCounter, MetricsSink};

/// Admission-related Prometheus metrics.
///
/// One `IntCounter` per [`AdmissionCounter`], plus a latency histogram
/// observed by callers around each admission call.
#[derive(Clone)]
pub struct AdmissionMetrics {
    counters: HashMap<AdmissionCounter, IntCounter>,
    /// Wall-clock latency of a full admission call, in seconds.
    pub admission_seconds: Histogram,
}

impl AdmissionMetrics {
    /// Registers admission metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let mut counters = HashMap::with_capacity(AdmissionCounter::ALL.len());
        for counter in AdmissionCounter::ALL {
            let c = IntCounter::with_opts(Opts::new(counter.name(), counter.help()))?;
            registry.register(Box::new(c.clone()))?;
            counters.insert(counter, c);
        }

        let admission_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "admission_seconds",
                "Time to validate, classify and commit a candidate block in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
        )?;
        registry.register(Box::new(admission_seconds.clone()))?;

        Ok(Self {
            counters,
            admission_seconds,
        })
    }

    /// Current value of a counter.
    pub fn get(&self, counter: AdmissionCounter) -> u64 {
        self.counters.get(&counter).map_or(0, |c| c.get())
    }
}

impl MetricsSink for AdmissionMetrics {
    fn increment(&self, counter: AdmissionCounter) {
        if let Some(c) = self.counters.get(&counter) {
            c.inc();
        }
    }
}

/// Wrapper around a Prometheus registry and the admission metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub admission: AdmissionMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the admission metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chain".to_string()), None)?;
        let admission = AdmissionMetrics::register(&registry)?;
        Ok(Self {
            registry,
            admission,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl MetricsSink for MetricsRegistry {
    fn increment(&self, counter: AdmissionCounter) {
        self.admission.increment(counter);
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(render(req.method(), req.uri().path(), &metrics))
}

fn render(method: &Method, path: &str, metrics: &MetricsRegistry) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/metrics") => {
            let mut resp = Response::new(Full::new(Bytes::from(metrics.gather_text())));
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            resp
        }
        _ => {
            let mut resp = Response::new(Full::new(Bytes::from("not found")));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            resp
        }
    }
}
