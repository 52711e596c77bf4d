pub mod logger;
pub mod metrics;
pub mod middleware;

#[cfg(any(feature = "axum-layer", test))]
pub use middleware::MetricsLayer;
pub use metrics::Metrics;


/// TelemetryConfig は telemetry ライブラリの初期化設定を保持する。
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub version: String,
    pub environment: String,
    /// EnvFilter 形式のディレクティブ（例: "info", "movies_server=debug,info"）。
    pub log_level: String,
    /// ログ出力フォーマット。"text" の場合はプレーンテキスト、それ以外は JSON。
    pub log_format: String,
}

/// init_telemetry は tracing-subscriber を初期化し、起動情報を記録する。
///
/// グローバルサブスクライバが既に設定されている場合はエラーを返す。
pub fn init_telemetry(cfg: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    logger::init_logger(&cfg.log_level, &cfg.log_format)?;

    tracing::info!(
        service = %cfg.service_name,
        version = %cfg.version,
        environment = %cfg.environment,
        "telemetry initialized"
    );
    Ok(())
}
