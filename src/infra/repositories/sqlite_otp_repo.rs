use crate::domain::{models::otp::{Otp, OtpType}, ports::OtpRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteOtpRepo { pool: SqlitePool }
impl SqliteOtpRepo { pub fn new(pool: SqlitePool) -> Self { Self { pool } } }

#[async_trait]
impl OtpRepository for SqliteOtpRepo {
    async fn replace(&self, otp: &Otp) -> Result<Otp, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        sqlx::query("DELETE FROM otps WHERE booking_id = ? AND otp_type = ?")
            .bind(&otp.booking_id).bind(otp.otp_type)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        let created = sqlx::query_as::<_, Otp>(
            "INSERT INTO otps (id, booking_id, otp_type, code_hash, attempts, expires_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&otp.id).bind(&otp.booking_id).bind(otp.otp_type).bind(&otp.code_hash)
            .bind(otp.attempts).bind(otp.expires_at).bind(otp.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find(&self, booking_id: &str, otp_type: OtpType) -> Result<Option<Otp>, AppError> {
        sqlx::query_as::<_, Otp>("SELECT * FROM otps WHERE booking_id = ? AND otp_type = ?")
            .bind(booking_id).bind(otp_type)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn increment_attempts(&self, id: &str) -> Result<i32, AppError> {
        sqlx::query_scalar::<_, i32>("UPDATE otps SET attempts = attempts + 1 WHERE id = ? RETURNING attempts")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("OTP not found".into()))
    }

    async fn consume(&self, id: &str, code_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM otps WHERE id = ? AND code_hash = ?")
            .bind(id).bind(code_hash)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM otps WHERE id = ?")
            .bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
