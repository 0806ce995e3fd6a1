use crate::domain::{
    models::technician::{Technician, TechnicianStats, TechnicianWithStats},
    ports::TechnicianRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteTechnicianRepo {
    pool: SqlitePool,
}

impl SqliteTechnicianRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TechnicianRepository for SqliteTechnicianRepo {
    async fn create(&self, technician: &Technician) -> Result<Technician, AppError> {
        sqlx::query_as::<_, Technician>(
            "INSERT INTO technicians (id, name, email, phone, password_hash, specialties, is_available, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&technician.id).bind(&technician.name).bind(&technician.email).bind(&technician.phone)
            .bind(&technician.password_hash).bind(&technician.specialties).bind(technician.is_available)
            .bind(technician.is_active).bind(technician.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Technician>, AppError> {
        sqlx::query_as::<_, Technician>("SELECT * FROM technicians WHERE email = ?")
            .bind(email).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Technician>, AppError> {
        sqlx::query_as::<_, Technician>("SELECT * FROM technicians WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_with_stats(&self) -> Result<Vec<TechnicianWithStats>, AppError> {
        sqlx::query_as::<_, TechnicianWithStats>(
            "SELECT t.*,
                (SELECT AVG(r.rating) FROM ratings r WHERE r.technician_id = t.id) AS average_rating,
                (SELECT COUNT(*) FROM ratings r WHERE r.technician_id = t.id) AS rating_count,
                (SELECT COUNT(*) FROM bookings b WHERE b.technician_id = t.id AND b.status = 'Completed') AS completed_jobs,
                (SELECT COUNT(*) FROM bookings b WHERE b.technician_id = t.id AND b.status IN ('Scheduled', 'Accepted', 'In Progress')) AS active_jobs
             FROM technicians t
             ORDER BY t.name ASC"
        )
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn stats(&self, id: &str) -> Result<TechnicianStats, AppError> {
        sqlx::query_as::<_, TechnicianStats>(
            "SELECT
                (SELECT AVG(rating) FROM ratings WHERE technician_id = ?1) AS average_rating,
                (SELECT COUNT(*) FROM ratings WHERE technician_id = ?1) AS rating_count,
                (SELECT COUNT(*) FROM bookings WHERE technician_id = ?1 AND status = 'Completed') AS completed_jobs,
                (SELECT COUNT(*) FROM bookings WHERE technician_id = ?1 AND status IN ('Scheduled', 'Accepted', 'In Progress')) AS active_jobs"
        )
            .bind(id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, technician: &Technician) -> Result<Technician, AppError> {
        sqlx::query_as::<_, Technician>(
            "UPDATE technicians SET name = ?, phone = ?, password_hash = ?, specialties = ?, is_available = ?, is_active = ?
             WHERE id = ?
             RETURNING *"
        )
            .bind(&technician.name).bind(&technician.phone).bind(&technician.password_hash).bind(&technician.specialties)
            .bind(technician.is_available).bind(technician.is_active).bind(&technician.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Technician not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM technicians WHERE id = ?")
            .bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Technician not found".into())); }
        Ok(())
    }
}
