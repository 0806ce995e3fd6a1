use crate::domain::{
    models::{auth::Role, notification::Notification},
    ports::NotificationRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteNotificationRepo {
    pool: SqlitePool,
}

impl SqliteNotificationRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepo {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, recipient_role, recipient_id, title, message, booking_id, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&notification.id)
            .bind(notification.recipient_role)
            .bind(&notification.recipient_id)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(&notification.booking_id)
            .bind(notification.is_read)
            .bind(notification.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Notification>, AppError> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for(&self, role: Role, subject_id: &str, unread_only: bool) -> Result<Vec<Notification>, AppError> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications
             WHERE recipient_role = ? AND (recipient_id IS NULL OR recipient_id = ?) AND (? = 0 OR is_read = 0)
             ORDER BY created_at DESC
             LIMIT 100"
        )
            .bind(role)
            .bind(subject_id)
            .bind(unread_only)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn mark_read(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_all_read(&self, role: Role, subject_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1
             WHERE recipient_role = ? AND (recipient_id IS NULL OR recipient_id = ?) AND is_read = 0"
        )
            .bind(role)
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
