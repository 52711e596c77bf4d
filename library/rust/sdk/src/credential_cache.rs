//! シングルフライトの資格情報キャッシュ。

use chrono::Utc;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::error::SdkError;
use crate::issuer::{IssueTokenRequest, TokenIssuer};
use crate::token::Credential;

/// CredentialCache は発行済みトークンを保持し、期限切れ時に発行元から取り直す。
///
/// 有効なトークンがあれば排他区間に入らずに返す。リフレッシュは同時に一つだけ実行され、
/// 発行元の失敗で既存のトークンが上書きされることはない。
pub struct CredentialCache {
    issuer: Arc<dyn TokenIssuer>,
    request: IssueTokenRequest,
    issuer_timeout: Duration,
    current: RwLock<Option<Arc<Credential>>>,
    refresh: Mutex<()>,
}

impl CredentialCache {
    pub fn new(
        issuer: Arc<dyn TokenIssuer>,
        request: IssueTokenRequest,
        issuer_timeout: Duration,
    ) -> Self {
        Self {
            issuer,
            request,
            issuer_timeout,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// 使用可能なエンコード済みトークンを返す。
    pub async fn acquire(&self) -> Result<String, SdkError> {
        if let Some(credential) = self.usable() {
            debug!("キャッシュ済みトークンを返します");
            return Ok(credential.encoded_token.clone());
        }

        // 区間に入った後の鮮度再確認はしない。待機していた呼び出しもそれぞれ発行する
        let _guard = self.refresh.lock().await;
        debug!("トークンをリフレッシュします");

        let encoded = tokio::time::timeout(self.issuer_timeout, self.issuer.issue(&self.request))
            .await
            .map_err(|_| {
                error!(timeout = ?self.issuer_timeout, "トークン発行がタイムアウトしました");
                SdkError::IssuerUnavailable(format!(
                    "issuer did not respond within {:?}",
                    self.issuer_timeout
                ))
            })??;

        let credential = Credential::decode(&encoded).map_err(|e| {
            error!(error = %e, "発行されたトークンを解析できません");
            SdkError::IssuerUnavailable(format!("issuer returned an undecodable token: {}", e))
        })?;

        debug!(expires_at = %credential.expires_at, "トークンを更新しました");
        Ok(self.store(credential).encoded_token.clone())
    }

    /// `"Bearer <token>"` 形式で返す。
    pub async fn bearer_header(&self) -> Result<String, SdkError> {
        Ok(format!("Bearer {}", self.acquire().await?))
    }

    /// 外部で取得したトークンで初期化する。解析できないトークンは保存しない。
    pub fn seed(&self, encoded_token: &str) -> Result<(), SdkError> {
        match Credential::decode(encoded_token) {
            Ok(credential) => {
                self.store(credential);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "シードされたトークンを解析できないため破棄します");
                Err(e)
            }
        }
    }

    /// キャッシュ済みトークンを破棄する。次の acquire で必ず発行元に問い合わせる。
    pub fn invalidate(&self) {
        let mut current = self.current.write().unwrap_or_else(|p| p.into_inner());
        *current = None;
    }

    /// 現在保持している資格情報（期限切れでも返す）。
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn usable(&self) -> Option<Arc<Credential>> {
        self.current()
            .filter(|credential| credential.is_usable_at(Utc::now()))
    }

    fn store(&self, credential: Credential) -> Arc<Credential> {
        let credential = Arc::new(credential);
        let mut current = self.current.write().unwrap_or_else(|p| p.into_inner());
        *current = Some(credential.clone());
        credential
    }
}
