use crate::domain::models::booking::BookingStatus;
use crate::domain::models::otp::OtpType;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub service_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub address: String,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct BookingStatusQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Deserialize)]
pub struct RateBookingRequest {
    pub rating: i32,
    pub review: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

#[derive(Deserialize)]
pub struct AssignTechnicianRequest {
    pub technician_id: String,
}

#[derive(Deserialize)]
pub struct GenerateOtpRequest {
    #[serde(rename = "type")]
    pub otp_type: OtpType,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(rename = "type")]
    pub otp_type: OtpType,
    pub code: String,
}

#[derive(Deserialize)]
pub struct CreateTechnicianRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub specialties: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateTechnicianRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub specialties: Option<Vec<String>>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: f64,
}

#[derive(Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
}

#[derive(Deserialize, Default)]
pub struct ServiceQuery {
    pub category: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}
