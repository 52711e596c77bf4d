use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metrics は Prometheus メトリクスのヘルパー構造体である。
/// RED メソッド（Rate, Errors, Duration）のメトリクスに加え、
/// 出力キャッシュと認可判定のメトリクスを提供する。
pub struct Metrics {
    pub http_requests_total: CounterVec,
    pub http_request_duration: HistogramVec,
    pub cache_hits_total: IntCounterVec,
    pub cache_misses_total: IntCounterVec,
    pub cache_invalidations_total: IntCounterVec,
    pub authorization_decisions_total: IntCounterVec,
    registry: Registry,
}

/// デフォルトのヒストグラムバケット。
const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

impl Metrics {
    /// new は Prometheus メトリクスを初期化して返す。
    /// service_name はメトリクスの service ラベルに使用される。
    pub fn new(service_name: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests")
                .const_label("service", service_name),
            &["method", "path", "status"],
        )?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Histogram of HTTP request latency",
            )
            .const_label("service", service_name)
            .buckets(DEFAULT_BUCKETS.to_vec()),
            &["method", "path"],
        )?;

        let cache_hits_total = IntCounterVec::new(
            Opts::new("cache_hits_total", "Total number of cache hits")
                .const_label("service", service_name),
            &["cache_name"],
        )?;

        let cache_misses_total = IntCounterVec::new(
            Opts::new("cache_misses_total", "Total number of cache misses")
                .const_label("service", service_name),
            &["cache_name"],
        )?;

        let cache_invalidations_total = IntCounterVec::new(
            Opts::new(
                "cache_invalidations_total",
                "Total number of tag invalidations",
            )
            .const_label("service", service_name),
            &["tag", "outcome"],
        )?;

        let authorization_decisions_total = IntCounterVec::new(
            Opts::new(
                "authorization_decisions_total",
                "Total number of policy evaluations",
            )
            .const_label("service", service_name),
            &["policy", "decision"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(cache_invalidations_total.clone()))?;
        registry.register(Box::new(authorization_decisions_total.clone()))?;

        Ok(Self {
            http_requests_total,
            http_request_duration,
            cache_hits_total,
            cache_misses_total,
            cache_invalidations_total,
            authorization_decisions_total,
            registry,
        })
    }

    /// record_http_request は HTTP リクエストカウンタをインクリメントする。
    pub fn record_http_request(&self, method: &str, path: &str, status: &str) {
        self.http_requests_total
            .with_label_values(&[method, path, status])
            .inc();
    }

    /// record_http_duration は HTTP リクエストのレイテンシをヒストグラムに記録する。
    pub fn record_http_duration(&self, method: &str, path: &str, duration_secs: f64) {
        self.http_request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_cache_hit(&self, cache_name: &str) {
        self.cache_hits_total.with_label_values(&[cache_name]).inc();
    }

    pub fn record_cache_miss(&self, cache_name: &str) {
        self.cache_misses_total
            .with_label_values(&[cache_name])
            .inc();
    }

    /// record_cache_invalidation はタグ無効化の結果（"ok" / "failed"）を記録する。
    pub fn record_cache_invalidation(&self, tag: &str, outcome: &str) {
        self.cache_invalidations_total
            .with_label_values(&[tag, outcome])
            .inc();
    }

    /// record_authorization はポリシー評価の結果（"allowed" / "denied"）を記録する。
    pub fn record_authorization(&self, policy: &str, decision: &str) {
        self.authorization_decisions_total
            .with_label_values(&[policy, decision])
            .inc();
    }

    /// gather_metrics は Prometheus テキストフォーマットでメトリクスを返す。
    /// /metrics エンドポイントのハンドラで使用する。
    pub fn gather_metrics(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
