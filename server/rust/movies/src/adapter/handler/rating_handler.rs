use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use movies_auth::CurrentPrincipal;
use movies_contracts::{MovieRatingResponse, MovieRatingsResponse, RateMovieRequest};
use movies_server_common::ServiceError;
use uuid::Uuid;

use super::error::{missing_user, rating_error};
use super::AppState;

/// PUT /api/movies/{id}/ratings
pub async fn rate_movie(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<Uuid>,
    Json(req): Json<RateMovieRequest>,
) -> Result<StatusCode, ServiceError> {
    let user_id = principal.user_id().ok_or_else(missing_user)?;
    state
        .rate_movie_uc
        .execute(id, req.rating, user_id)
        .await
        .map_err(rating_error)?;
    Ok(StatusCode::OK)
}

/// DELETE /api/movies/{id}/ratings
pub async fn delete_rating(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let user_id = principal.user_id().ok_or_else(missing_user)?;
    state
        .delete_rating_uc
        .execute(id, user_id)
        .await
        .map_err(rating_error)?;
    Ok(StatusCode::OK)
}

/// GET /api/ratings/me
pub async fn get_user_ratings(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<MovieRatingsResponse>, ServiceError> {
    let user_id = principal.user_id().ok_or_else(missing_user)?;
    let ratings = state
        .get_user_ratings_uc
        .execute(user_id)
        .await
        .map_err(rating_error)?;

    let items = ratings
        .into_iter()
        .map(|r| MovieRatingResponse {
            movie_id: r.movie_id,
            slug: r.slug,
            rating: r.rating,
        })
        .collect();
    Ok(Json(MovieRatingsResponse { items }))
}
