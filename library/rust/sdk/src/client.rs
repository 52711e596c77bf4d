//! movies API の型付き HTTP クライアント。
//!
//! エラー応答は `{"error": {...}}` エンベロープから [`SdkError::Api`] に変換し、
//! 401 を受けたらキャッシュ済みのトークンを破棄して次の呼び出しで取り直す。

use std::sync::Arc;
use std::time::Duration;

use movies_contracts::{
    ApiErrorEnvelope, CreateMovieRequest, GetAllMoviesRequest, MovieRatingsResponse,
    MovieResponse, MoviesResponse, RateMovieRequest, UpdateMovieRequest,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::SdkConfig;
use crate::credential_cache::CredentialCache;
use crate::error::SdkError;
use crate::issuer::{HttpTokenIssuer, IssueTokenRequest};

/// MoviesApiClient は movies API の型付きクライアント。
///
/// すべてのリクエストに CredentialCache から取得した Bearer トークンを付与する。
/// 401 を受け取った場合はキャッシュを破棄するが、リトライは呼び出し側に任せる。
pub struct MoviesApiClient {
    base_url: String,
    http_client: reqwest::Client,
    credentials: Arc<CredentialCache>,
}

impl MoviesApiClient {
    /// 設定から HTTP 発行元と資格情報キャッシュを組み立てる。
    pub fn from_config(config: SdkConfig) -> Result<Self, SdkError> {
        if config.base_url.is_empty() {
            return Err(SdkError::Config("base_url が空です".to_string()));
        }
        let issuer = HttpTokenIssuer::new(&config)?;
        let credentials = Arc::new(CredentialCache::new(
            Arc::new(issuer),
            IssueTokenRequest::from_config(&config),
            Duration::from_secs(config.issuer_timeout_secs),
        ));
        Self::with_credentials(&config, credentials)
    }

    /// 既存の資格情報キャッシュを共有してクライアントを生成する。
    pub fn with_credentials(
        config: &SdkConfig,
        credentials: Arc<CredentialCache>,
    ) -> Result<Self, SdkError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SdkError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// ID またはスラッグで映画を取得する。
    pub async fn get_movie(&self, id_or_slug: &str) -> Result<MovieResponse, SdkError> {
        let path = format!("/api/movies/{}", id_or_slug);
        let response = self.send(self.request(Method::GET, &path).await?).await?;
        Self::json(response).await
    }

    pub async fn get_movies(
        &self,
        query: &GetAllMoviesRequest,
    ) -> Result<MoviesResponse, SdkError> {
        let builder = self.request(Method::GET, "/api/movies").await?.query(query);
        let response = self.send(builder).await?;
        Self::json(response).await
    }

    pub async fn create_movie(
        &self,
        request: &CreateMovieRequest,
    ) -> Result<MovieResponse, SdkError> {
        let builder = self.request(Method::POST, "/api/movies").await?.json(request);
        let response = self.send(builder).await?;
        Self::json(response).await
    }

    /// 複数の映画を一括登録する（成功時 204）。
    pub async fn create_movies(&self, requests: &[CreateMovieRequest]) -> Result<(), SdkError> {
        let builder = self
            .request(Method::POST, "/api/movies/batch")
            .await?
            .json(requests);
        self.send(builder).await?;
        Ok(())
    }

    pub async fn update_movie(
        &self,
        id: Uuid,
        request: &UpdateMovieRequest,
    ) -> Result<MovieResponse, SdkError> {
        let path = format!("/api/movies/{}", id);
        let builder = self.request(Method::PUT, &path).await?.json(request);
        let response = self.send(builder).await?;
        Self::json(response).await
    }

    pub async fn delete_movie(&self, id: Uuid) -> Result<bool, SdkError> {
        let path = format!("/api/movies/{}", id);
        let response = self.send(self.request(Method::DELETE, &path).await?).await?;
        Self::json(response).await
    }

    pub async fn rate_movie(&self, id: Uuid, rating: i32) -> Result<(), SdkError> {
        let path = format!("/api/movies/{}/ratings", id);
        let builder = self
            .request(Method::PUT, &path)
            .await?
            .json(&RateMovieRequest { rating });
        self.send(builder).await?;
        Ok(())
    }

    pub async fn delete_rating(&self, id: Uuid) -> Result<(), SdkError> {
        let path = format!("/api/movies/{}/ratings", id);
        self.send(self.request(Method::DELETE, &path).await?).await?;
        Ok(())
    }

    /// 認証ユーザー自身の評価一覧を取得する。
    pub async fn get_user_ratings(&self) -> Result<MovieRatingsResponse, SdkError> {
        let response = self
            .send(self.request(Method::GET, "/api/ratings/me").await?)
            .await?;
        Self::json(response).await
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, SdkError> {
        let bearer = self.credentials.bearer_header().await?;
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "API リクエストを送信します");
        Ok(self
            .http_client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, bearer))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, SdkError> {
        let response = builder.send().await.map_err(|e| {
            error!(error = %e, "API への HTTP リクエストに失敗しました");
            SdkError::Http(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("API が 401 を返したためキャッシュ済みトークンを破棄します");
            self.credentials.invalidate();
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::api_error(status, &body))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, SdkError> {
        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "API レスポンスの解析に失敗しました");
            SdkError::Http(e.to_string())
        })
    }

    fn api_error(status: StatusCode, body: &str) -> SdkError {
        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) {
            return SdkError::Api {
                status: status.as_u16(),
                code: Some(envelope.error.code),
                message: envelope.error.message,
            };
        }

        // 認証層は {"error": code, "message": ...} の平坦な形で返す
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            if let Some(code) = value.get("error").and_then(|v| v.as_str()) {
                return SdkError::Api {
                    status: status.as_u16(),
                    code: Some(code.to_string()),
                    message: value
                        .get("message")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                };
            }
        }

        SdkError::Api {
            status: status.as_u16(),
            code: None,
            message: body.to_string(),
        }
    }
}
