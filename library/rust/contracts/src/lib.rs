//! movies-contracts: movies API のリクエスト・レスポンス型。
//!
//! JSON は camelCase で、サーバーと SDK の双方がこの型を使う。

pub mod requests;
pub mod responses;

pub use requests::{
    CreateMovieRequest, GetAllMoviesRequest, RateMovieRequest, UpdateMovieRequest,
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use responses::{
    ApiErrorBody, ApiErrorDetail, ApiErrorEnvelope, Link, MovieRatingResponse,
    MovieRatingsResponse, MovieResponse, MoviesResponse,
};
