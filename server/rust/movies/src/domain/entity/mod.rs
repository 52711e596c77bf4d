pub mod movie;
pub mod movie_query;
pub mod rating;

pub use movie::Movie;
pub use movie_query::{MovieQuery, SortField, SortOrder};
pub use rating::MovieRating;
