use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

use crate::domain::models::booking::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpType {
    Start,
    Completion,
}

impl OtpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpType::Start => "START",
            OtpType::Completion => "COMPLETION",
        }
    }

    /// Status the booking must be in for a code of this type to be issued or verified.
    pub fn required_status(&self) -> BookingStatus {
        match self {
            OtpType::Start => BookingStatus::Accepted,
            OtpType::Completion => BookingStatus::InProgress,
        }
    }

    /// Status the booking moves to once the code is verified.
    pub fn target_status(&self) -> BookingStatus {
        match self {
            OtpType::Start => BookingStatus::InProgress,
            OtpType::Completion => BookingStatus::Completed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Otp {
    pub id: String,
    pub booking_id: String,
    pub otp_type: OtpType,
    #[serde(skip_serializing)]
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Otp {
    pub fn new(booking_id: String, otp_type: OtpType, code_hash: String, ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id,
            otp_type,
            code_hash,
            attempts: 0,
            expires_at: now + Duration::minutes(ttl_minutes),
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
