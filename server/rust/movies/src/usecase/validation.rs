use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::domain::entity::movie_query::parse_sort;
use crate::domain::entity::rating::{MAX_RATING, MIN_RATING};
use crate::domain::entity::{Movie, MovieQuery};
use crate::domain::repository::MovieRepository;
use movies_contracts::{GetAllMoviesRequest, MAX_PAGE_SIZE};

use super::error::{CatalogError, ValidationFailure};

/// 映画の入力値を検証する。スラッグの重複は同じ ID の映画なら許す。
pub async fn validate_movie(movie: &Movie, repo: &dyn MovieRepository) -> Result<(), CatalogError> {
    let mut failures = Vec::new();

    if movie.title.trim().is_empty() {
        failures.push(ValidationFailure::new("title", "required", "title must not be empty"));
    }
    if movie.genres.is_empty() || movie.genres.iter().any(|g| g.trim().is_empty()) {
        failures.push(ValidationFailure::new(
            "genres",
            "required",
            "at least one non-empty genre is required",
        ));
    }
    let current_year = Utc::now().year();
    if movie.year_of_release > current_year {
        failures.push(ValidationFailure::new(
            "yearOfRelease",
            "out_of_range",
            format!("yearOfRelease must be {} or earlier", current_year),
        ));
    }

    if !failures.is_empty() {
        return Err(CatalogError::Validation(failures));
    }

    let slug = movie.slug();
    if let Some(existing) = repo.get_by_slug(&slug, None).await? {
        if existing.id != movie.id {
            return Err(CatalogError::SlugConflict(slug));
        }
    }

    Ok(())
}

pub fn validate_rating(rating: i32) -> Result<(), CatalogError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CatalogError::validation(
            "rating",
            "out_of_range",
            format!("rating must be between {} and {}", MIN_RATING, MAX_RATING),
        ));
    }
    Ok(())
}

/// 一覧取得リクエストを検証し、既定値を適用したクエリに変換する。
pub fn to_movie_query(
    request: &GetAllMoviesRequest,
    user_id: Option<Uuid>,
) -> Result<MovieQuery, CatalogError> {
    let mut failures = Vec::new();

    let sort = match request.sort_by.as_deref().filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match parse_sort(raw) {
            Some(sort) => Some(sort),
            None => {
                failures.push(ValidationFailure::new(
                    "sortBy",
                    "invalid",
                    "sortBy must be 'title' or 'yearofrelease', optionally prefixed with '+' or '-'",
                ));
                None
            }
        },
    };

    let page = request.page_or_default();
    if page < 1 {
        failures.push(ValidationFailure::new("page", "out_of_range", "page must be 1 or greater"));
    }

    let page_size = request.page_size_or_default();
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        failures.push(ValidationFailure::new(
            "pageSize",
            "out_of_range",
            format!("pageSize must be between 1 and {}", MAX_PAGE_SIZE),
        ));
    }

    if !failures.is_empty() {
        return Err(CatalogError::Validation(failures));
    }

    Ok(MovieQuery {
        title: request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        year: request.year,
        sort,
        page,
        page_size,
        user_id,
    })
}
