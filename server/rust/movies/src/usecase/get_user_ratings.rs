use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::MovieRating;
use crate::domain::repository::RatingRepository;

use super::error::CatalogError;

pub struct GetUserRatingsUseCase {
    ratings: Arc<dyn RatingRepository>,
}

impl GetUserRatingsUseCase {
    pub fn new(ratings: Arc<dyn RatingRepository>) -> Self {
        Self { ratings }
    }

    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<MovieRating>, CatalogError> {
        Ok(self.ratings.get_ratings_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::rating_repository::MockRatingRepository;

    #[tokio::test]
    async fn test_returns_ratings_of_user() {
        let user = Uuid::new_v4();
        let mut mock = MockRatingRepository::new();
        mock.expect_get_ratings_for_user()
            .withf(move |u| *u == user)
            .returning(|_| {
                Ok(vec![MovieRating {
                    movie_id: Uuid::new_v4(),
                    slug: "heat-1995".into(),
                    rating: 5,
                }])
            });

        let uc = GetUserRatingsUseCase::new(Arc::new(mock));
        let ratings = uc.execute(user).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].slug, "heat-1995");
    }
}
