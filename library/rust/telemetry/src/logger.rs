//! 構造化ログユーティリティ。
//! tracing クレートを使用し、JSON またはテキスト形式の構造化ログを出力する。
//!
//! # 使用例
//!
//! ```ignore
//! use tracing::{info, warn, error};
//!
//! info!(movie_id = %id, "movie created");
//! warn!(tag = "movies", error = %e, "output cache invalidation failed");
//! ```

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// init_logger は tracing-subscriber を初期化する。
///
/// `RUST_LOG` が設定されていればそれを優先し、なければ `level` を使う。
/// format が "text" の場合はプレーンテキスト出力、それ以外は JSON 出力。
pub fn init_logger(level: &str, format: &str) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(build_filter(level));

    if format == "text" {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE),
            )
            .try_init()
    }
}

/// build_filter は RUST_LOG か指定レベルから EnvFilter を生成する。
/// 解析できないディレクティブは info にフォールバックする。
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
