pub mod movie_repository;
pub mod rating_repository;

pub use movie_repository::MovieRepository;
pub use rating_repository::RatingRepository;
