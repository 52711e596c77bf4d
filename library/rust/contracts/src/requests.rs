use serde::{Deserialize, Serialize};

/// page 省略時の既定値。
pub const DEFAULT_PAGE: u32 = 1;

/// pageSize 省略時の既定値。
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// pageSize の上限。
pub const MAX_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    pub title: String,
    pub year_of_release: i32,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieRequest {
    pub title: String,
    pub year_of_release: i32,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateMovieRequest {
    pub rating: i32,
}

/// GetAllMoviesRequest は一覧取得のクエリパラメータ。
///
/// `sortBy` は `title` / `yearofrelease` に任意で `+`（昇順）/ `-`（降順）を前置する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAllMoviesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl GetAllMoviesRequest {
    pub fn page_or_default(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE)
    }

    pub fn page_size_or_default(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_uses_camel_case() {
        let req: CreateMovieRequest = serde_json::from_str(
            r#"{"title":"Nick the Greek","yearOfRelease":2023,"genres":["Comedy"]}"#,
        )
        .unwrap();
        assert_eq!(req.year_of_release, 2023);
        assert_eq!(req.genres, vec!["Comedy"]);
    }

    #[test]
    fn test_get_all_defaults() {
        let req: GetAllMoviesRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.page_or_default(), DEFAULT_PAGE);
        assert_eq!(req.page_size_or_default(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_get_all_skips_missing_fields_when_serialized() {
        let req = GetAllMoviesRequest {
            sort_by: Some("-title".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "sortBy": "-title" }));
    }
}
