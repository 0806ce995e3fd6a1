use crate::domain::{
    models::analytics::{DashboardStats, MonthlyRevenue, ServiceBreakdown, StatusCount, TopTechnician},
    ports::AnalyticsRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteAnalyticsRepo {
    pool: SqlitePool,
}

impl SqliteAnalyticsRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    async fn count(&self, sql: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await.map_err(AppError::Database)
    }
}

#[async_trait]
impl AnalyticsRepository for SqliteAnalyticsRepo {
    async fn dashboard(&self) -> Result<DashboardStats, AppError> {
        let total_bookings = self.count("SELECT COUNT(*) FROM bookings").await?;
        let total_customers = self.count("SELECT COUNT(*) FROM users").await?;
        let total_technicians = self.count("SELECT COUNT(*) FROM technicians").await?;
        let active_technicians = self.count("SELECT COUNT(*) FROM technicians WHERE is_active = 1").await?;

        let total_revenue = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(amount), 0.0) FROM bookings WHERE status = 'Completed'"
        )
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;

        let bookings_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM bookings GROUP BY status ORDER BY count DESC, status ASC"
        )
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;

        let services = sqlx::query_as::<_, ServiceBreakdown>(
            "SELECT service_name,
                    COUNT(*) AS bookings,
                    COALESCE(SUM(CASE WHEN status = 'Completed' THEN amount ELSE 0.0 END), 0.0) AS revenue
             FROM bookings
             GROUP BY service_name
             ORDER BY bookings DESC, service_name ASC"
        )
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;

        let mut monthly_revenue = sqlx::query_as::<_, MonthlyRevenue>(
            "SELECT substr(date, 1, 7) AS month, COUNT(*) AS bookings, COALESCE(SUM(amount), 0.0) AS revenue
             FROM bookings
             WHERE status = 'Completed'
             GROUP BY month
             ORDER BY month DESC
             LIMIT 12"
        )
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;
        monthly_revenue.reverse();

        let top_technicians = sqlx::query_as::<_, TopTechnician>(
            "SELECT t.id AS technician_id, t.name AS name, AVG(r.rating) AS average_rating, COUNT(r.id) AS rating_count
             FROM ratings r
             JOIN technicians t ON t.id = r.technician_id
             GROUP BY t.id, t.name
             ORDER BY average_rating DESC, rating_count DESC
             LIMIT 5"
        )
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;

        Ok(DashboardStats {
            total_bookings,
            total_customers,
            total_technicians,
            active_technicians,
            total_revenue,
            bookings_by_status,
            services,
            monthly_revenue,
            top_technicians,
        })
    }
}
