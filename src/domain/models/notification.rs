use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::models::auth::Role;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Notification {
    pub id: String,
    pub recipient_role: Role,
    /// `None` addresses every account holding `recipient_role`.
    pub recipient_id: Option<String>,
    pub title: String,
    pub message: String,
    pub booking_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient_role: Role, recipient_id: Option<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_role,
            recipient_id,
            title: title.into(),
            message: message.into(),
            booking_id: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn for_booking(mut self, booking_id: &str) -> Self {
        self.booking_id = Some(booking_id.to_string());
        self
    }

    pub fn is_visible_to(&self, role: Role, subject_id: &str) -> bool {
        self.recipient_role == role
            && self.recipient_id.as_deref().is_none_or(|id| id == subject_id)
    }
}
