//! Prometheus metrics for the judge worker

use std::sync::LazyLock;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Judging duration histogram
pub static JUDGE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        "ojs_judge_duration_seconds",
        "Time spent judging submissions",
    )
    .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);

    HistogramVec::new(opts, &["language"]).expect("Failed to create histogram")
});

/// Verdict counter by code
pub static VERDICT_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let opts = Opts::new("ojs_verdict_total", "Total verdicts by code");
    IntCounterVec::new(opts, &["verdict"]).expect("Failed to create counter")
});

/// Messages processed counter
pub static MESSAGES_PROCESSED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("ojs_messages_processed_total", "Total messages processed")
        .expect("Failed to create counter")
});

/// Messages left for redelivery counter
pub static MESSAGES_RETRIED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ojs_messages_retried_total",
        "Total messages left unacknowledged for redelivery",
    )
    .expect("Failed to create counter")
});

/// Currently judging gauge
pub static ACTIVE_JOBS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new("ojs_active_jobs", "Currently active judging jobs")
        .expect("Failed to create gauge")
});

/// Initialize and register all metrics
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(JUDGE_DURATION.clone()))
        .expect("Failed to register metric");
    REGISTRY
        .register(Box::new(VERDICT_TOTAL.clone()))
        .expect("Failed to register metric");
    REGISTRY
        .register(Box::new(MESSAGES_PROCESSED.clone()))
        .expect("Failed to register metric");
    REGISTRY
        .register(Box::new(MESSAGES_RETRIED.clone()))
        .expect("Failed to register metric");
    REGISTRY
        .register(Box::new(ACTIVE_JOBS.clone()))
        .expect("Failed to register metric");
}

/// Record a verdict
pub fn record_verdict(code: &str) {
    VERDICT_TOTAL.with_label_values(&[code]).inc();
}

/// Record a judged submission's duration
pub fn record_judge_duration(language: &str, seconds: f64) {
    JUDGE_DURATION.with_label_values(&[language]).observe(seconds);
}

/// HTTP server for the Prometheus metrics endpoint
pub struct MetricsServer;

impl MetricsServer {
    /// Run the metrics server
    pub async fn run(port: u16) -> anyhow::Result<()> {
        use axum::{routing::get, Router};
        use std::net::SocketAddr;

        init_metrics();

        let app = Router::new()
            .route("/metrics", get(Self::metrics_handler))
            .route("/health", get(|| async { "OK" }));

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("Metrics server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    async fn metrics_handler() -> String {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}
