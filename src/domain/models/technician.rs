use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Technician {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub specialties: Json<Vec<String>>,
    pub is_available: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Technician {
    pub fn new(name: String, email: String, phone: String, specialties: Vec<String>, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            phone,
            password_hash,
            specialties: Json(specialties),
            is_available: true,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Aggregates computed at query time from `ratings` and `bookings`.
#[derive(Debug, Serialize, FromRow, Clone, Default)]
pub struct TechnicianStats {
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    pub completed_jobs: i64,
    pub active_jobs: i64,
}

#[derive(Debug, Serialize, FromRow, Clone)]
pub struct TechnicianWithStats {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub technician: Technician,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stats: TechnicianStats,
}
