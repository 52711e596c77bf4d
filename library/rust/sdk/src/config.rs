//! SDK の設定構造体。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// timeout_secs のデフォルト値（10 秒）。
fn default_timeout_secs() -> u64 {
    10
}

/// issuer_timeout_secs のデフォルト値（10 秒）。
fn default_issuer_timeout_secs() -> u64 {
    10
}

/// SdkConfig は movies API クライアントの設定を表す。
///
/// YAML または JSON から serde でデシリアライズ可能。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// movies API のベース URL。例: `http://localhost:5000`
    pub base_url: String,

    /// トークン発行エンドポイント URL。例: `http://localhost:5002/token`
    pub token_endpoint: String,

    /// 発行依頼に含めるユーザー ID（userid Claim になる）。
    pub user_id: String,

    /// 発行依頼に含めるメールアドレス。
    pub email: String,

    /// 発行依頼に含めるカスタム Claim（admin, trusted_member など）。
    #[serde(default)]
    pub custom_claims: HashMap<String, serde_json::Value>,

    /// API 呼び出しの HTTP タイムアウト秒数（デフォルト: 10 秒）。
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// トークン発行呼び出しの上限秒数（デフォルト: 10 秒）。
    #[serde(default = "default_issuer_timeout_secs")]
    pub issuer_timeout_secs: u64,
}

impl SdkConfig {
    /// 最小限の設定で SdkConfig を生成する。
    pub fn new(base_url: &str, token_endpoint: &str, user_id: &str, email: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token_endpoint: token_endpoint.to_string(),
            user_id: user_id.to_string(),
            email: email.to_string(),
            custom_claims: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            issuer_timeout_secs: default_issuer_timeout_secs(),
        }
    }

    /// カスタム Claim を追加する。
    pub fn with_claim(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.custom_claims.insert(name.to_string(), value.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_issuer_timeout_secs(mut self, secs: u64) -> Self {
        self.issuer_timeout_secs = secs;
        self
    }
}
