pub mod error;
pub mod health;
pub mod movie_handler;
pub mod rating_handler;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use movies_auth::{authenticate, AuthState, ADMIN_POLICY, AUTHENTICATED_POLICY, TRUSTED_MEMBER_POLICY};
use movies_telemetry::Metrics;
use tower_http::trace::TraceLayer;

use crate::adapter::middleware::policy::{require_policy, PolicyState};
use crate::domain::repository::{MovieRepository, RatingRepository};
use crate::infrastructure::cache::OutputCache;
use crate::usecase::{
    CreateMovieUseCase, DeleteMovieUseCase, DeleteRatingUseCase, GetMovieUseCase,
    GetUserRatingsUseCase, ListMoviesUseCase, RateMovieUseCase, UpdateMovieUseCase,
};

/// AppState はアプリケーション全体の共有状態を表す。
#[derive(Clone)]
pub struct AppState {
    pub create_movie_uc: Arc<CreateMovieUseCase>,
    pub get_movie_uc: Arc<GetMovieUseCase>,
    pub list_movies_uc: Arc<ListMoviesUseCase>,
    pub update_movie_uc: Arc<UpdateMovieUseCase>,
    pub delete_movie_uc: Arc<DeleteMovieUseCase>,
    pub rate_movie_uc: Arc<RateMovieUseCase>,
    pub delete_rating_uc: Arc<DeleteRatingUseCase>,
    pub get_user_ratings_uc: Arc<GetUserRatingsUseCase>,
    pub output_cache: Arc<OutputCache>,
    pub metrics: Arc<Metrics>,
    pub auth_state: AuthState,
}

impl AppState {
    /// リポジトリと共有コンポーネントからユースケースを組み立てる。
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        ratings: Arc<dyn RatingRepository>,
        output_cache: Arc<OutputCache>,
        metrics: Arc<Metrics>,
        auth_state: AuthState,
    ) -> Self {
        Self {
            create_movie_uc: Arc::new(CreateMovieUseCase::new(
                movies.clone(),
                output_cache.clone(),
            )),
            get_movie_uc: Arc::new(GetMovieUseCase::new(movies.clone())),
            list_movies_uc: Arc::new(ListMoviesUseCase::new(movies.clone())),
            update_movie_uc: Arc::new(UpdateMovieUseCase::new(
                movies.clone(),
                output_cache.clone(),
            )),
            delete_movie_uc: Arc::new(DeleteMovieUseCase::new(movies, output_cache.clone())),
            rate_movie_uc: Arc::new(RateMovieUseCase::new(
                ratings.clone(),
                output_cache.clone(),
            )),
            delete_rating_uc: Arc::new(DeleteRatingUseCase::new(
                ratings.clone(),
                output_cache.clone(),
            )),
            get_user_ratings_uc: Arc::new(GetUserRatingsUseCase::new(ratings)),
            output_cache,
            metrics,
            auth_state,
        }
    }
}

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    let policy = PolicyState {
        engine: state.auth_state.engine.clone(),
        metrics: state.metrics.clone(),
    };

    // 認証不要のエンドポイント
    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics));

    // 読み取りはポリシーなし。匿名なら出力キャッシュを使う
    let read_routes = Router::new()
        .route("/api/movies", get(movie_handler::list_movies))
        .route("/api/movies/{id}", get(movie_handler::get_movie));

    // 登録・更新 -> Trusted
    let trusted_routes = Router::new()
        .route("/api/movies", post(movie_handler::create_movie))
        .route("/api/movies/batch", post(movie_handler::create_movies))
        .route("/api/movies/{id}", put(movie_handler::update_movie))
        .route_layer(axum::middleware::from_fn(require_policy(
            policy.clone(),
            TRUSTED_MEMBER_POLICY,
        )));

    // 削除 -> Admin（API キーによる昇格あり）
    let admin_routes = Router::new()
        .route(
            "/api/movies/{id}",
            axum::routing::delete(movie_handler::delete_movie),
        )
        .route_layer(axum::middleware::from_fn(require_policy(
            policy.clone(),
            ADMIN_POLICY,
        )));

    // 評価 -> Authenticated
    let rating_routes = Router::new()
        .route(
            "/api/movies/{id}/ratings",
            put(rating_handler::rate_movie).delete(rating_handler::delete_rating),
        )
        .route("/api/ratings/me", get(rating_handler::get_user_ratings))
        .route_layer(axum::middleware::from_fn(require_policy(
            policy,
            AUTHENTICATED_POLICY,
        )));

    // 認証ミドルウェアを全 API ルートに適用
    let api_routes = Router::new()
        .merge(read_routes)
        .merge(trusted_routes)
        .merge(admin_routes)
        .merge(rating_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.auth_state.clone(),
            authenticate,
        ));

    public_routes
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
