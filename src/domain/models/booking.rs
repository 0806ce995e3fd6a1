use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a repair booking.
///
/// ```text
/// Pending -> Scheduled -> Accepted -> In Progress -> Completed
///    |           |                        |
///    +-----------+-------> Cancelled <----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum BookingStatus {
    Pending,
    Scheduled,
    Accepted,
    #[serde(rename = "In Progress")]
    #[sqlx(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Scheduled,
        BookingStatus::Accepted,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Scheduled => "Scheduled",
            BookingStatus::Accepted => "Accepted",
            BookingStatus::InProgress => "In Progress",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Scheduled)
                | (Pending, Cancelled)
                | (Scheduled, Accepted)
                | (Scheduled, Cancelled)
                | (Accepted, InProgress)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown booking status '{}'", s))
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub technician_id: Option<String>,
    pub service_id: String,
    pub service_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub address: String,
    pub notes: Option<String>,
    pub amount: f64,
    pub status: BookingStatus,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub user_id: String,
    pub service_id: String,
    pub service_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub address: String,
    pub notes: Option<String>,
    pub amount: f64,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: params.user_id,
            technician_id: None,
            service_id: params.service_id,
            service_name: params.service_name,
            date: params.date,
            time: params.time,
            address: params.address,
            notes: params.notes,
            amount: params.amount,
            status: BookingStatus::Pending,
            rating: None,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assigned_to(&self, technician_id: &str) -> bool {
        self.technician_id.as_deref() == Some(technician_id)
    }
}

/// Booking joined with the names an admin table or CSV export needs.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct BookingDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub technician_name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub technician_id: Option<String>,
    pub user_id: Option<String>,
}
