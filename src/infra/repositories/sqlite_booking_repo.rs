use crate::domain::{
    models::{
        booking::{Booking, BookingDetails, BookingFilter, BookingStatus},
        job::Job,
        rating::Rating,
    },
    ports::BookingRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

const DETAILS_SELECT: &str = "SELECT b.*, u.name AS customer_name, u.email AS customer_email, u.phone AS customer_phone, t.name AS technician_name
     FROM bookings b
     LEFT JOIN users u ON u.id = b.user_id
     LEFT JOIN technicians t ON t.id = b.technician_id";

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn insert_jobs(tx: &mut Transaction<'_, Sqlite>, jobs: Vec<Job>) -> Result<(), AppError> {
    for job in jobs {
        sqlx::query("INSERT INTO jobs (id, job_type, payload, execute_at, status, error_message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(&job.id).bind(&job.job_type).bind(&job.payload).bind(job.execute_at)
            .bind(&job.status).bind(&job.error_message).bind(job.created_at)
            .execute(&mut **tx).await.map_err(AppError::Database)?;
    }
    Ok(())
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create(&self, booking: &Booking, jobs: Vec<Job>) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let created = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, user_id, technician_id, service_id, service_name, date, time, address, notes, amount, status, rating, review, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.user_id).bind(&booking.technician_id).bind(&booking.service_id)
            .bind(&booking.service_name).bind(booking.date).bind(&booking.time).bind(&booking.address)
            .bind(&booking.notes).bind(booking.amount).bind(booking.status).bind(booking.rating)
            .bind(&booking.review).bind(booking.created_at).bind(booking.updated_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_details(&self, id: &str) -> Result<Option<BookingDetails>, AppError> {
        sqlx::query_as::<_, BookingDetails>(&format!("{} WHERE b.id = ?", DETAILS_SELECT))
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_user(&self, user_id: &str, status: Option<BookingStatus>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = ? AND (? IS NULL OR status = ?) ORDER BY date DESC, time DESC"
        )
            .bind(user_id).bind(status).bind(status)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_technician(&self, technician_id: &str, status: Option<BookingStatus>) -> Result<Vec<BookingDetails>, AppError> {
        sqlx::query_as::<_, BookingDetails>(&format!(
            "{} WHERE b.technician_id = ? AND (? IS NULL OR b.status = ?) ORDER BY b.date ASC, b.time ASC",
            DETAILS_SELECT
        ))
            .bind(technician_id).bind(status).bind(status)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_details(&self, filter: &BookingFilter) -> Result<Vec<BookingDetails>, AppError> {
        sqlx::query_as::<_, BookingDetails>(&format!(
            "{} WHERE (? IS NULL OR b.status = ?)
                AND (? IS NULL OR b.technician_id = ?)
                AND (? IS NULL OR b.user_id = ?)
             ORDER BY b.date DESC, b.time DESC, b.created_at DESC",
            DETAILS_SELECT
        ))
            .bind(filter.status).bind(filter.status)
            .bind(&filter.technician_id).bind(&filter.technician_id)
            .bind(&filter.user_id).bind(&filter.user_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn save_transition(&self, booking: &Booking, expected: BookingStatus, technician_available: Option<bool>, jobs: Vec<Job>) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = ?, technician_id = ?, updated_at = ? WHERE id = ? AND status = ? RETURNING *"
        )
            .bind(booking.status).bind(&booking.technician_id).bind(Utc::now()).bind(&booking.id).bind(expected)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::Conflict("Booking was changed by another request; reload and try again".into()))?;

        if let (Some(available), Some(technician_id)) = (technician_available, &updated.technician_id) {
            sqlx::query("UPDATE technicians SET is_available = ? WHERE id = ?")
                .bind(available).bind(technician_id)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }

        insert_jobs(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn find_technician_conflict(&self, technician_id: &str, date: NaiveDate, time: &str, exclude_booking_id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings
             WHERE technician_id = ? AND date = ? AND time = ? AND id != ?
               AND status IN ('Scheduled', 'Accepted', 'In Progress')
             LIMIT 1"
        )
            .bind(technician_id).bind(date).bind(time).bind(exclude_booking_id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn rate(&self, booking: &Booking, rating: &Rating) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("INSERT INTO ratings (id, booking_id, user_id, technician_id, rating, review, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(&rating.id).bind(&rating.booking_id).bind(&rating.user_id).bind(&rating.technician_id)
            .bind(rating.rating).bind(&rating.review).bind(rating.created_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET rating = ?, review = ?, updated_at = ? WHERE id = ? RETURNING *"
        )
            .bind(rating.rating).bind(&rating.review).bind(Utc::now()).bind(&booking.id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let deleted = sqlx::query_as::<_, Booking>("DELETE FROM bookings WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Booking not found".into()))?;

        // Accepted and in-progress jobs are the ones that mark their technician busy.
        if matches!(deleted.status, BookingStatus::Accepted | BookingStatus::InProgress)
            && let Some(technician_id) = &deleted.technician_id
        {
            sqlx::query("UPDATE technicians SET is_available = 1 WHERE id = ?")
                .bind(technician_id)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn count_by_user(&self, user_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE user_id = ?")
            .bind(user_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_active_by_technician(&self, technician_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE technician_id = ? AND status IN ('Scheduled', 'Accepted', 'In Progress')"
        )
            .bind(technician_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_active_by_service(&self, service_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE service_id = ? AND status NOT IN ('Completed', 'Cancelled')"
        )
            .bind(service_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }
}
