use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use movies_auth::{ApiKeySettings, AuthState, AuthorizationEngine, TokenVerifier};
use movies_cache::{CacheConsistencyCoordinator, InMemoryOutputCacheStore, OutputCacheStore};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use movies_server::adapter::handler::{router, AppState};
use movies_server::adapter::repository::InMemoryCatalogRepository;
use movies_server::infrastructure::cache::OutputCache;
use movies_server::infrastructure::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    // Telemetry
    let telemetry_cfg = movies_telemetry::TelemetryConfig {
        service_name: cfg.app.name.clone(),
        version: cfg.app.version.clone(),
        environment: cfg.app.environment.clone(),
        log_level: cfg.log.level.clone(),
        log_format: cfg.log.format.clone(),
    };
    movies_telemetry::init_telemetry(&telemetry_cfg)
        .map_err(|e| anyhow::anyhow!("failed to init telemetry: {}", e))?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting movies server"
    );

    // Metrics (shared across layers, cache and policy middleware)
    let metrics = Arc::new(movies_telemetry::Metrics::new(&cfg.app.name)?);

    // Token verifier
    let signing_key = cfg
        .auth
        .signing_key
        .as_ref()
        .map(|k| k.expose_secret().as_bytes().to_vec())
        .unwrap_or_default();
    let verifier = Arc::new(
        TokenVerifier::new(&signing_key, &cfg.auth.issuer, &cfg.auth.audience)
            .with_leeway(cfg.auth.leeway_secs),
    );
    info!(issuer = %cfg.auth.issuer, audience = %cfg.auth.audience, "token verifier initialized");

    // Authorization policies
    if cfg.api_key.secret.is_none() {
        info!("no api key configured, header escalation to admin is disabled");
    }
    let engine = Arc::new(AuthorizationEngine::with_default_policies(ApiKeySettings {
        header_name: cfg.api_key.header_name.clone(),
        secret: cfg
            .api_key
            .secret
            .clone()
            .unwrap_or_else(|| SecretString::new(String::new())),
        service_user_id: cfg.api_key.service_user_id.clone(),
    }));
    let auth_state = AuthState { verifier, engine };

    // Output cache store: Redis if configured, otherwise in-memory
    let store = build_cache_store(&cfg).await?;
    let coordinator = Arc::new(CacheConsistencyCoordinator::with_ttl(
        store,
        Duration::from_secs(cfg.cache.ttl_seconds),
    ));
    let output_cache = Arc::new(OutputCache::with_metrics(coordinator, metrics.clone()));
    info!(
        max_entries = cfg.cache.max_entries,
        ttl_seconds = cfg.cache.ttl_seconds,
        "output cache initialized"
    );

    // Catalog repository
    let catalog = Arc::new(InMemoryCatalogRepository::new());

    let state = AppState::new(
        catalog.clone(),
        catalog,
        output_cache,
        metrics.clone(),
        auth_state,
    );

    // REST router
    let app = router(state).layer(movies_telemetry::MetricsLayer::new(metrics));

    let host: std::net::IpAddr = cfg.server.host.parse()?;
    let rest_addr = SocketAddr::new(host, cfg.server.port);
    info!("REST server starting on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(movies_server_common::shutdown::shutdown_signal())
        .await?;

    info!("movies server stopped");
    Ok(())
}

#[cfg(feature = "redis")]
async fn build_cache_store(cfg: &Config) -> anyhow::Result<Arc<dyn OutputCacheStore>> {
    if let Some(ref url) = cfg.cache.redis_url {
        info!("connecting to Redis output cache...");
        let store = movies_cache::redis::RedisOutputCacheStore::new(url)
            .await?
            .with_prefix(format!("{}:output", cfg.app.name));
        info!("connected to Redis output cache");
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(InMemoryOutputCacheStore::with_capacity(
        cfg.cache.max_entries,
    )))
}

#[cfg(not(feature = "redis"))]
async fn build_cache_store(cfg: &Config) -> anyhow::Result<Arc<dyn OutputCacheStore>> {
    if cfg.cache.redis_url.is_some() {
        tracing::warn!("cache.redis_url is set but the redis feature is disabled, using in-memory store");
    }
    Ok(Arc::new(InMemoryOutputCacheStore::with_capacity(
        cfg.cache.max_entries,
    )))
}
