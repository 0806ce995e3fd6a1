use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Rating {
    pub id: String,
    pub booking_id: String,
    pub user_id: String,
    /// Cleared when the technician account is deleted; the rating itself stays.
    pub technician_id: Option<String>,
    pub rating: i32,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(booking_id: String, user_id: String, technician_id: String, rating: i32, review: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id,
            user_id,
            technician_id: Some(technician_id),
            rating,
            review,
            created_at: Utc::now(),
        }
    }
}
