use crate::domain::{models::rating::Rating, ports::RatingRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteRatingRepo { pool: SqlitePool }
impl SqliteRatingRepo { pub fn new(pool: SqlitePool) -> Self { Self { pool } } }

#[async_trait]
impl RatingRepository for SqliteRatingRepo {
    async fn list_by_technician(&self, technician_id: &str) -> Result<Vec<Rating>, AppError> {
        sqlx::query_as::<_, Rating>("SELECT * FROM ratings WHERE technician_id = ? ORDER BY created_at DESC")
            .bind(technician_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
