pub mod create_movie;
pub mod delete_movie;
pub mod delete_rating;
pub mod error;
pub mod get_movie;
pub mod get_user_ratings;
pub mod list_movies;
pub mod rate_movie;
pub mod update_movie;
pub mod validation;

pub use create_movie::{CreateMovieInput, CreateMovieUseCase};
pub use delete_movie::DeleteMovieUseCase;
pub use delete_rating::DeleteRatingUseCase;
pub use error::{CatalogError, ValidationFailure};
pub use get_movie::GetMovieUseCase;
pub use get_user_ratings::GetUserRatingsUseCase;
pub use list_movies::{ListMoviesUseCase, MoviePage};
pub use rate_movie::RateMovieUseCase;
pub use update_movie::{UpdateMovieInput, UpdateMovieUseCase};
