use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link はリソースに対して実行できる操作へのリンク。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type")]
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    /// 全ユーザーの平均評価。評価がなければ null。
    pub rating: Option<f32>,
    /// リクエストしたユーザー自身の評価。
    pub user_rating: Option<i32>,
    pub year_of_release: i32,
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// MoviesResponse はページング付きの一覧レスポンス。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviesResponse {
    pub items: Vec<MovieResponse>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub has_next_page: bool,
}

impl MoviesResponse {
    pub fn new(items: Vec<MovieResponse>, page: u32, page_size: u32, total: u64) -> Self {
        Self {
            items,
            page,
            page_size,
            total,
            has_next_page: total > u64::from(page) * u64::from(page_size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRatingResponse {
    pub movie_id: Uuid,
    pub slug: String,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRatingsResponse {
    pub items: Vec<MovieRatingResponse>,
}

/// ApiErrorEnvelope はサーバーのエラーレスポンス `{ "error": { ... } }` を読むための型。
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub field: String,
    pub reason: String,
    pub message: String,
}
