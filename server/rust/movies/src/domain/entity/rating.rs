use uuid::Uuid;

/// MovieRating はあるユーザーが付けた映画の評価。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieRating {
    pub movie_id: Uuid,
    pub slug: String,
    pub rating: i32,
}

/// 評価の下限。
pub const MIN_RATING: i32 = 1;

/// 評価の上限。
pub const MAX_RATING: i32 = 5;
