use axum::extract::{Path, Query, State};
use axum::http::header::{HeaderName, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use movies_auth::CurrentPrincipal;
use movies_cache::{CachedPayload, QuerySignature};
use movies_contracts::{
    CreateMovieRequest, GetAllMoviesRequest, Link, MovieResponse, MoviesResponse,
    UpdateMovieRequest,
};
use movies_server_common::ServiceError;
use serde::Serialize;
use uuid::Uuid;

use super::AppState;
use crate::domain::entity::Movie;
use crate::usecase::{CatalogError, CreateMovieInput, MoviePage, UpdateMovieInput};

/// レスポンスがキャッシュから返されたかを示すヘッダー。
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

const MOVIES_PATH: &str = "/api/movies";

// --- Helper ---

fn movie_path(id: Uuid) -> String {
    format!("{}/{}", MOVIES_PATH, id)
}

fn link(href: &str, rel: &str, method: &str) -> Link {
    Link {
        href: href.to_string(),
        rel: rel.to_string(),
        method: method.to_string(),
    }
}

fn to_movie_response(movie: &Movie) -> MovieResponse {
    MovieResponse {
        id: movie.id,
        title: movie.title.clone(),
        slug: movie.slug(),
        rating: movie.rating,
        user_rating: movie.user_rating,
        year_of_release: movie.year_of_release,
        genres: movie.genres.clone(),
        links: vec![],
    }
}

/// 単体取得のレスポンスにだけ操作リンクを付ける。
fn with_links(mut resp: MovieResponse) -> MovieResponse {
    let href = movie_path(resp.id);
    resp.links = vec![
        link(&href, "self", "GET"),
        link(&href, "update", "PUT"),
        link(&href, "delete", "DELETE"),
    ];
    resp
}

fn to_movies_response(page: MoviePage) -> MoviesResponse {
    let items = page.movies.iter().map(to_movie_response).collect();
    MoviesResponse::new(items, page.page, page.page_size, page.total)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CatalogError> {
    serde_json::to_vec(value).map_err(|e| CatalogError::Internal(e.to_string()))
}

fn cached_json(cached: CachedPayload) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/json"),
            (X_CACHE, cached.status.as_str()),
        ],
        cached.payload,
    )
        .into_response()
}

/// 一覧クエリのキャッシュキー。ページ指定は既定値を適用してから含める。
fn list_signature(request: &GetAllMoviesRequest) -> QuerySignature {
    QuerySignature::new(MOVIES_PATH)
        .param_opt("title", request.title.as_deref().map(str::trim))
        .param_opt("year", request.year)
        .param_opt("sortBy", request.sort_by.as_deref())
        .param("page", request.page_or_default())
        .param("pageSize", request.page_size_or_default())
}

// --- Handlers ---

/// POST /api/movies
pub async fn create_movie(
    State(state): State<AppState>,
    Json(req): Json<CreateMovieRequest>,
) -> Result<Response, ServiceError> {
    let movie = state
        .create_movie_uc
        .execute(CreateMovieInput {
            title: req.title,
            year_of_release: req.year_of_release,
            genres: req.genres,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        [(LOCATION, movie_path(movie.id))],
        Json(to_movie_response(&movie)),
    )
        .into_response())
}

/// POST /api/movies/batch
pub async fn create_movies(
    State(state): State<AppState>,
    Json(reqs): Json<Vec<CreateMovieRequest>>,
) -> Result<StatusCode, ServiceError> {
    let inputs = reqs
        .into_iter()
        .map(|req| CreateMovieInput {
            title: req.title,
            year_of_release: req.year_of_release,
            genres: req.genres,
        })
        .collect();
    state.create_movie_uc.execute_batch(inputs).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/movies/{id}
///
/// パスは ID とスラッグのどちらでもよい。匿名リクエストだけが出力キャッシュを使う。
pub async fn get_movie(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id_or_slug): Path<String>,
) -> Result<Response, ServiceError> {
    if principal.is_authenticated() {
        let movie = state
            .get_movie_uc
            .execute(&id_or_slug, principal.user_id())
            .await?;
        return Ok(Json(with_links(to_movie_response(&movie))).into_response());
    }

    let key = QuerySignature::new(MOVIES_PATH).segment(&id_or_slug).into_key();
    let uc = &state.get_movie_uc;
    let id_or_slug = id_or_slug.as_str();
    let cached = state
        .output_cache
        .get_or_compute(key, move || async move {
            let movie = uc.execute(id_or_slug, None).await?;
            encode(&with_links(to_movie_response(&movie)))
        })
        .await?;
    Ok(cached_json(cached))
}

/// GET /api/movies
pub async fn list_movies(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(request): Query<GetAllMoviesRequest>,
) -> Result<Response, ServiceError> {
    if principal.is_authenticated() {
        let page = state
            .list_movies_uc
            .execute(&request, principal.user_id())
            .await?;
        return Ok(Json(to_movies_response(page)).into_response());
    }

    let key = list_signature(&request).into_key();
    let uc = &state.list_movies_uc;
    let request = &request;
    let cached = state
        .output_cache
        .get_or_compute(key, move || async move {
            let page = uc.execute(request, None).await?;
            encode(&to_movies_response(page))
        })
        .await?;
    Ok(cached_json(cached))
}

/// PUT /api/movies/{id}
pub async fn update_movie(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMovieRequest>,
) -> Result<Json<MovieResponse>, ServiceError> {
    let movie = state
        .update_movie_uc
        .execute(
            UpdateMovieInput {
                id,
                title: req.title,
                year_of_release: req.year_of_release,
                genres: req.genres,
            },
            principal.user_id(),
        )
        .await?;
    Ok(Json(to_movie_response(&movie)))
}

/// DELETE /api/movies/{id}
pub async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<bool>, ServiceError> {
    state.delete_movie_uc.execute(id).await?;
    Ok(Json(true))
}
