//! トークン発行元とのやり取り。

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error};

use crate::config::SdkConfig;
use crate::error::SdkError;

/// IssueTokenRequest は発行元に送る固定の発行依頼。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    #[serde(rename = "userid")]
    pub user_id: String,
    pub email: String,
    pub custom_claims: HashMap<String, serde_json::Value>,
}

impl IssueTokenRequest {
    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            user_id: config.user_id.clone(),
            email: config.email.clone(),
            custom_claims: config.custom_claims.clone(),
        }
    }
}

/// TokenIssuer は新しいエンコード済みトークンを発行するトレイト。
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// 発行依頼を送り、エンコード済みトークン文字列を返す。
    async fn issue(&self, request: &IssueTokenRequest) -> Result<String, SdkError>;
}

/// HttpTokenIssuer は HTTP POST でトークンを発行してもらう実装。
///
/// 応答本文はトークン文字列そのもの。
pub struct HttpTokenIssuer {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpTokenIssuer {
    pub fn new(config: &SdkConfig) -> Result<Self, SdkError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.issuer_timeout_secs))
            .build()
            .map_err(|e| SdkError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.token_endpoint.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self, request: &IssueTokenRequest) -> Result<String, SdkError> {
        debug!(endpoint = %self.endpoint, user_id = %request.user_id, "トークンを発行依頼します");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "トークン発行エンドポイントへの HTTP リクエストに失敗しました");
                SdkError::IssuerUnavailable(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = %e, "トークン発行レスポンスの読み取りに失敗しました");
            SdkError::IssuerUnavailable(e.to_string())
        })?;

        if !status.is_success() {
            error!(status = %status, body = %body, "トークン発行に失敗しました");
            return Err(SdkError::IssuerUnavailable(format!("HTTP {} - {}", status, body)));
        }

        // JSON 文字列で返す発行元もあるため引用符を外す
        let token = body.trim().trim_matches('"').to_string();
        if token.is_empty() {
            error!("トークン発行レスポンスが空でした");
            return Err(SdkError::IssuerUnavailable("empty token body".to_string()));
        }

        Ok(token)
    }
}
