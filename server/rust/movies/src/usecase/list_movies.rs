use std::sync::Arc;

use movies_contracts::GetAllMoviesRequest;
use uuid::Uuid;

use crate::domain::entity::Movie;
use crate::domain::repository::MovieRepository;

use super::error::CatalogError;
use super::validation::to_movie_query;

/// MoviePage は一覧取得の 1 ページ分。
#[derive(Debug, Clone)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

pub struct ListMoviesUseCase {
    repo: Arc<dyn MovieRepository>,
}

impl ListMoviesUseCase {
    pub fn new(repo: Arc<dyn MovieRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        request: &GetAllMoviesRequest,
        user_id: Option<Uuid>,
    ) -> Result<MoviePage, CatalogError> {
        let query = to_movie_query(request, user_id)?;
        let movies = self.repo.get_all(&query).await?;
        let total = self.repo.count(&query).await?;

        Ok(MoviePage {
            movies,
            page: query.page,
            page_size: query.page_size,
            total,
        })
    }
}
