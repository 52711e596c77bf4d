use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// JWT 署名鍵を上書きする環境変数名。
pub const SIGNING_KEY_ENV: &str = "MOVIES_JWT_SIGNING_KEY";

/// API キーを上書きする環境変数名。
pub const API_KEY_ENV: &str = "MOVIES_API_KEY";

/// Application configuration for the movies server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub api_key: ApiKeyConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_yaml(&content)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(content)?;
        Ok(cfg)
    }

    /// 機密値を環境変数で上書きする。
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(SIGNING_KEY_ENV).filter(|v| !v.is_empty()) {
            self.auth.signing_key = Some(SecretString::new(key));
        }
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.api_key.secret = Some(SecretString::new(key));
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let has_key = self
            .auth
            .signing_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty());
        if !has_key {
            anyhow::bail!(
                "auth.signing_key is not configured (set it in the config file or {})",
                SIGNING_KEY_ENV
            );
        }
        if self.cache.ttl_seconds == 0 {
            anyhow::bail!("cache.ttl_seconds must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// AuthConfig は Bearer トークン検証の設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    /// HS256 の共有鍵。ファイルに書かず環境変数で渡すことを推奨する。
    #[serde(default)]
    pub signing_key: Option<SecretString>,
    #[serde(default)]
    pub leeway_secs: u64,
}

/// ApiKeyConfig は共有シークレットヘッダーによる管理者昇格の設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    #[serde(default = "default_api_key_header")]
    pub header_name: String,
    /// 未設定ならヘッダーによる昇格は無効。
    #[serde(default)]
    pub secret: Option<SecretString>,
    #[serde(default = "default_service_user_id")]
    pub service_user_id: String,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            header_name: default_api_key_header(),
            secret: None,
            service_user_id: default_service_user_id(),
        }
    }
}

fn default_api_key_header() -> String {
    movies_auth::DEFAULT_API_KEY_HEADER.to_string()
}

fn default_service_user_id() -> String {
    "d8566de3-b1a6-4a9b-b842-8e3887a82e42".to_string()
}

/// CacheConfig は出力キャッシュの設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// 設定すると Redis を共有ストアとして使う（redis feature が必要）。
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_seconds: default_ttl_seconds(),
            redis_url: None,
        }
    }
}

fn default_max_entries() -> usize {
    10000
}

fn default_ttl_seconds() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
